//! Maps view-model errors to ventus_core::AppError for consistent
//! user-facing messages. Gateway errors convert in ventus-services.

mod bulk;
