//! GTK4/Libadwaita front end

pub mod app;
pub mod window;
pub mod worker;

pub use app::PreviewApplication;
