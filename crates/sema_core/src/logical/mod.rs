pub mod analytic_window;
pub mod binder;
