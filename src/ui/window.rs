//! Preview Window - theme list with preview and set-default actions
//!
//! Themes are read straight from disk; only the privileged actions go
//! through the helper, via the worker thread.

use crate::config::Config;
use crate::daemon_conf;
use crate::theme::{discover_themes, Theme};
use crate::ui::app::PreviewApplication;
use crate::ui::worker::{self, HelperRequest, WorkerMessage};
use adw::prelude::*;
use adw::subclass::prelude::*;
use gtk::glib;
use std::cell::{Cell, RefCell};

mod imp {
    use super::*;

    #[derive(gtk::CompositeTemplate)]
    #[template(string = r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <interface>
            <template class="PtpWindow" parent="AdwApplicationWindow">
                <property name="default-width">560</property>
                <property name="default-height">620</property>
                <property name="title">Plymouth Theme Preview</property>
                <style>
                    <class name="ptp-window"/>
                </style>
                <property name="content">
                    <object class="AdwToastOverlay" id="toast_overlay">
                        <property name="child">
                            <object class="GtkBox">
                                <property name="orientation">vertical</property>

                                <child>
                                    <object class="AdwHeaderBar">
                                        <property name="title-widget">
                                            <object class="AdwWindowTitle" id="window_title">
                                                <property name="title">Boot Splash Themes</property>
                                            </object>
                                        </property>
                                        <child type="end">
                                            <object class="GtkButton" id="reload_button">
                                                <property name="icon-name">view-refresh-symbolic</property>
                                                <property name="tooltip-text">Reload themes</property>
                                            </object>
                                        </child>
                                    </object>
                                </child>

                                <!-- Theme list -->
                                <child>
                                    <object class="GtkScrolledWindow">
                                        <property name="vexpand">true</property>
                                        <property name="hscrollbar-policy">never</property>
                                        <property name="child">
                                            <object class="AdwClamp">
                                                <property name="margin-top">12</property>
                                                <property name="margin-bottom">12</property>
                                                <property name="margin-start">12</property>
                                                <property name="margin-end">12</property>
                                                <property name="child">
                                                    <object class="GtkListBox" id="theme_list">
                                                        <property name="selection-mode">single</property>
                                                        <property name="valign">start</property>
                                                        <style>
                                                            <class name="boxed-list"/>
                                                        </style>
                                                    </object>
                                                </property>
                                            </object>
                                        </property>
                                    </object>
                                </child>

                                <!-- Action bar -->
                                <child>
                                    <object class="GtkBox">
                                        <property name="orientation">horizontal</property>
                                        <property name="spacing">12</property>
                                        <property name="margin-start">12</property>
                                        <property name="margin-end">12</property>
                                        <property name="margin-top">6</property>
                                        <property name="margin-bottom">6</property>
                                        <style>
                                            <class name="ptp-action-bar"/>
                                        </style>
                                        <child>
                                            <object class="GtkLabel">
                                                <property name="label">Seconds</property>
                                            </object>
                                        </child>
                                        <child>
                                            <object class="GtkSpinButton" id="duration_spin">
                                                <property name="numeric">true</property>
                                                <property name="adjustment">
                                                    <object class="GtkAdjustment">
                                                        <property name="lower">1</property>
                                                        <property name="upper">120</property>
                                                        <property name="step-increment">1</property>
                                                        <property name="page-increment">10</property>
                                                        <property name="value">10</property>
                                                    </object>
                                                </property>
                                            </object>
                                        </child>
                                        <child>
                                            <object class="GtkCheckButton" id="rebuild_check">
                                                <property name="label">Rebuild initramfs</property>
                                                <property name="tooltip-text">Needed for the new theme to show at the next boot on most systems</property>
                                            </object>
                                        </child>
                                        <child>
                                            <object class="GtkSpinner" id="spinner">
                                                <property name="hexpand">true</property>
                                                <property name="halign">end</property>
                                            </object>
                                        </child>
                                        <child>
                                            <object class="GtkButton" id="preview_button">
                                                <property name="label">Preview</property>
                                            </object>
                                        </child>
                                        <child>
                                            <object class="GtkButton" id="default_button">
                                                <property name="label">Set as Default</property>
                                                <style>
                                                    <class name="suggested-action"/>
                                                </style>
                                            </object>
                                        </child>
                                    </object>
                                </child>

                                <child>
                                    <object class="GtkLabel" id="status_label">
                                        <property name="xalign">0</property>
                                        <property name="margin-start">12</property>
                                        <property name="margin-bottom">8</property>
                                        <property name="ellipsize">end</property>
                                        <style>
                                            <class name="caption"/>
                                            <class name="dim-label"/>
                                        </style>
                                    </object>
                                </child>
                            </object>
                        </property>
                    </object>
                </property>
            </template>
        </interface>
    "#)]
    pub struct PreviewWindow {
        #[template_child]
        pub toast_overlay: TemplateChild<adw::ToastOverlay>,
        #[template_child]
        pub window_title: TemplateChild<adw::WindowTitle>,
        #[template_child]
        pub reload_button: TemplateChild<gtk::Button>,
        #[template_child]
        pub theme_list: TemplateChild<gtk::ListBox>,
        #[template_child]
        pub duration_spin: TemplateChild<gtk::SpinButton>,
        #[template_child]
        pub rebuild_check: TemplateChild<gtk::CheckButton>,
        #[template_child]
        pub spinner: TemplateChild<gtk::Spinner>,
        #[template_child]
        pub preview_button: TemplateChild<gtk::Button>,
        #[template_child]
        pub default_button: TemplateChild<gtk::Button>,
        #[template_child]
        pub status_label: TemplateChild<gtk::Label>,

        pub config: RefCell<Config>,
        pub themes: RefCell<Vec<Theme>>,
        pub default_theme: RefCell<Option<String>>,
        pub busy: Cell<bool>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for PreviewWindow {
        const NAME: &'static str = "PtpWindow";
        type Type = super::PreviewWindow;
        type ParentType = adw::ApplicationWindow;

        fn class_init(klass: &mut Self::Class) {
            klass.bind_template();
        }

        fn instance_init(obj: &glib::subclass::InitializingObject<Self>) {
            obj.init_template();
        }
    }

    impl ObjectImpl for PreviewWindow {
        fn constructed(&self) {
            self.parent_constructed();

            let window = self.obj();

            self.reload_button.connect_clicked(glib::clone!(
                @weak window =>
                move |_| {
                    window.reload_themes();
                }
            ));

            self.preview_button.connect_clicked(glib::clone!(
                @weak window =>
                move |_| {
                    window.preview_selected();
                }
            ));

            self.default_button.connect_clicked(glib::clone!(
                @weak window =>
                move |_| {
                    window.confirm_set_default();
                }
            ));

            self.theme_list.connect_row_selected(glib::clone!(
                @weak window =>
                move |_, _| {
                    window.update_sensitivity();
                }
            ));
        }
    }

    impl WidgetImpl for PreviewWindow {}
    impl WindowImpl for PreviewWindow {}
    impl ApplicationWindowImpl for PreviewWindow {}
    impl AdwApplicationWindowImpl for PreviewWindow {}

    impl Default for PreviewWindow {
        fn default() -> Self {
            Self {
                toast_overlay: TemplateChild::default(),
                window_title: TemplateChild::default(),
                reload_button: TemplateChild::default(),
                theme_list: TemplateChild::default(),
                duration_spin: TemplateChild::default(),
                rebuild_check: TemplateChild::default(),
                spinner: TemplateChild::default(),
                preview_button: TemplateChild::default(),
                default_button: TemplateChild::default(),
                status_label: TemplateChild::default(),
                config: RefCell::new(Config::default()),
                themes: RefCell::new(Vec::new()),
                default_theme: RefCell::new(None),
                busy: Cell::new(false),
            }
        }
    }
}

glib::wrapper! {
    pub struct PreviewWindow(ObjectSubclass<imp::PreviewWindow>)
        @extends adw::ApplicationWindow, gtk::ApplicationWindow, gtk::Window, gtk::Widget,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget, gtk::Native, gtk::Root, gtk::ShortcutManager;
}

impl PreviewWindow {
    pub fn new(app: &PreviewApplication, config: Config) -> Self {
        let window: Self = glib::Object::builder()
            .property("application", app)
            .build();

        let imp = window.imp();
        imp.duration_spin
            .set_value(f64::from(config.preview.duration_secs));
        *imp.config.borrow_mut() = config;

        window.reload_themes();
        window
    }

    /// Re-read the themes directory and the configured default
    pub fn reload_themes(&self) {
        let imp = self.imp();
        let config = imp.config.borrow().clone();

        let themes = match discover_themes(&config.plymouth.themes_dir) {
            Ok(themes) => themes,
            Err(e) => {
                tracing::warn!("{:#}", e);
                self.toast(&format!("Could not read themes: {}", e));
                Vec::new()
            }
        };
        let default_theme =
            daemon_conf::current_theme(&config.plymouth.daemon_conf, &config.plymouth.daemon_defaults);

        let list = &imp.theme_list;
        while let Some(child) = list.first_child() {
            list.remove(&child);
        }

        let mut default_row = None;
        for theme in &themes {
            let row = adw::ActionRow::builder()
                .title(glib::markup_escape_text(&theme.display_name).as_str())
                .subtitle(glib::markup_escape_text(&theme.description).as_str())
                .activatable(true)
                .build();

            let module = gtk::Label::builder()
                .label(&theme.module)
                .css_classes(["caption", "dim-label"])
                .build();
            row.add_suffix(&module);

            if default_theme.as_deref() == Some(theme.name.as_str()) {
                let check = gtk::Image::from_icon_name("object-select-symbolic");
                check.set_tooltip_text(Some("Current default"));
                row.add_suffix(&check);
                default_row = Some(row.clone());
            }

            list.append(&row);
        }

        if let Some(row) = default_row {
            list.select_row(Some(&row));
        }

        let subtitle = match &default_theme {
            Some(name) => format!("{} installed, default: {}", themes.len(), name),
            None => format!("{} installed", themes.len()),
        };
        imp.window_title.set_subtitle(&subtitle);

        *imp.themes.borrow_mut() = themes;
        *imp.default_theme.borrow_mut() = default_theme;
        self.update_sensitivity();
    }

    fn selected_theme(&self) -> Option<Theme> {
        let imp = self.imp();
        let row = imp.theme_list.selected_row()?;
        let index = usize::try_from(row.index()).ok()?;
        imp.themes.borrow().get(index).cloned()
    }

    fn update_sensitivity(&self) {
        let imp = self.imp();
        let idle = !imp.busy.get();
        let selected = self.selected_theme();

        imp.preview_button.set_sensitive(idle && selected.is_some());
        imp.default_button.set_sensitive(idle && selected.is_some());
        imp.reload_button.set_sensitive(idle);
        imp.theme_list.set_sensitive(idle);
    }

    fn preview_selected(&self) {
        let Some(theme) = self.selected_theme() else {
            return;
        };
        let seconds = u32::try_from(self.imp().duration_spin.value_as_int()).unwrap_or(1);

        self.start_request(HelperRequest::Preview {
            theme: theme.name,
            seconds,
        });
    }

    fn confirm_set_default(&self) {
        let Some(theme) = self.selected_theme() else {
            return;
        };
        let rebuild_initrd = self.imp().rebuild_check.is_active();

        let body = if rebuild_initrd {
            format!(
                "{} will be shown at the next boot. Rebuilding the initramfs can take a while.",
                theme.display_name
            )
        } else {
            format!("{} will be shown at the next boot.", theme.display_name)
        };

        let dialog = adw::MessageDialog::new(Some(self), Some("Change Boot Splash?"), Some(&body));
        dialog.add_responses(&[("cancel", "Cancel"), ("apply", "Set as Default")]);
        dialog.set_response_appearance("apply", adw::ResponseAppearance::Suggested);
        dialog.set_default_response(Some("cancel"));
        dialog.set_close_response("cancel");

        dialog.connect_response(
            None,
            glib::clone!(@weak self as window => move |_, response| {
                if response == "apply" {
                    window.start_request(HelperRequest::SetDefault {
                        theme: theme.name.clone(),
                        rebuild_initrd,
                    });
                }
            }),
        );

        dialog.present();
    }

    fn start_request(&self, request: HelperRequest) {
        let imp = self.imp();
        if imp.busy.replace(true) {
            return;
        }

        imp.spinner.start();
        imp.status_label.set_label(&request.progress_text());
        self.update_sensitivity();

        let reload = matches!(request, HelperRequest::SetDefault { .. });
        worker::run_request(
            request,
            glib::clone!(@weak self as window => move |message| {
                window.handle_worker_message(message, reload);
            }),
        );
    }

    fn handle_worker_message(&self, message: WorkerMessage, reload: bool) {
        let imp = self.imp();

        match message {
            WorkerMessage::Started => {
                tracing::debug!("Helper accepted request");
            }
            WorkerMessage::Finished(result) => {
                imp.busy.set(false);
                imp.spinner.stop();
                imp.status_label.set_label("");

                match result {
                    Ok(summary) => self.toast(&summary),
                    Err(err) => self.toast(&err),
                }

                if reload {
                    self.reload_themes();
                } else {
                    self.update_sensitivity();
                }
            }
        }
    }

    fn toast(&self, text: &str) {
        // Toast titles are markup
        let toast = adw::Toast::new(&glib::markup_escape_text(text));
        toast.set_timeout(5);
        self.imp().toast_overlay.add_toast(toast);
    }
}
