pub mod config;
mod ignore_poison;
pub mod report;
pub mod session;
pub mod sync;
