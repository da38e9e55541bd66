//! Preview Application - GTK4 Application Setup

use crate::config::Config;
use crate::ui::window::PreviewWindow;
use adw::prelude::*;
use adw::subclass::prelude::*;
use gtk::gio;
use std::cell::RefCell;

/// Application ID, also used for the single-instance check
pub const APP_ID: &str = "ru.gentoo.PlymouthThemePreview";

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct PreviewApplication {
        pub config: RefCell<Config>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for PreviewApplication {
        const NAME: &'static str = "PtpApplication";
        type Type = super::PreviewApplication;
        type ParentType = adw::Application;
    }

    impl ObjectImpl for PreviewApplication {}

    impl ApplicationImpl for PreviewApplication {
        fn activate(&self) {
            let app = self.obj();

            // A second launch raises the existing window
            if let Some(window) = app.active_window() {
                window.present();
                return;
            }

            let window = PreviewWindow::new(&app, self.config.borrow().clone());
            window.present();
        }

        fn startup(&self) {
            self.parent_startup();

            let css_provider = gtk::CssProvider::new();
            css_provider.load_from_data(include_str!("styles.css"));

            match gtk::gdk::Display::default() {
                Some(display) => {
                    gtk::style_context_add_provider_for_display(
                        &display,
                        &css_provider,
                        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
                    );
                }
                None => {
                    tracing::warn!("No display available, skipping stylesheet");
                }
            }

            let app = self.obj();
            app.setup_actions();
        }
    }

    impl GtkApplicationImpl for PreviewApplication {}
    impl AdwApplicationImpl for PreviewApplication {}
}

glib::wrapper! {
    pub struct PreviewApplication(ObjectSubclass<imp::PreviewApplication>)
        @extends adw::Application, gtk::Application, gio::Application,
        @implements gio::ActionGroup, gio::ActionMap;
}

impl PreviewApplication {
    pub fn new(config: Config) -> Self {
        let app: Self = glib::Object::builder()
            .property("application-id", APP_ID)
            .property("flags", gio::ApplicationFlags::FLAGS_NONE)
            .build();

        *app.imp().config.borrow_mut() = config;
        app
    }

    fn setup_actions(&self) {
        let quit_action = gio::SimpleAction::new("quit", None);
        quit_action.connect_activate(glib::clone!(
            @weak self as app =>
            move |_, _| {
                app.quit();
            }
        ));
        self.add_action(&quit_action);
        self.set_accels_for_action("app.quit", &["<Ctrl>q"]);

        let reload_action = gio::SimpleAction::new("reload", None);
        reload_action.connect_activate(glib::clone!(
            @weak self as app =>
            move |_, _| {
                if let Some(window) = app.active_window().and_downcast::<PreviewWindow>() {
                    window.reload_themes();
                }
            }
        ));
        self.add_action(&reload_action);
        self.set_accels_for_action("app.reload", &["<Ctrl>r", "F5"]);
    }

    /// Run the main loop; GTK sees no command-line arguments
    pub fn run(&self) -> glib::ExitCode {
        self.run_with_args::<&str>(&[])
    }
}
