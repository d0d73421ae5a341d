// Library root: the app event loop and the terminal UI, exposed so the
// integration tests can drive them.

pub mod app;
pub mod tui;
