//! Consent prompter (§4.3).
//!
//! The prompter is re-architected per the Design Notes as a lazily
//! initializing object exposing a synchronous `ask()`, rather than relying
//! on a process-global graphical toolkit init that runs even on paths that
//! never prompt. Mirrors the jailer's `Sandbox` trait + cfg-gated
//! platform-selection shape: one trait, a headless fallback always
//! compiled in, and an optional graphical implementation behind a feature.

use crate::consent::store::Decision;
use crate::manifest::Capability;

/// Input/output contract of a single prompt, independent of how it is
/// rendered.
pub trait ConsentPrompter {
    /// Block until the user answers. Any outcome other than an explicit
    /// "Allow" click — including window-close and cancel — must return
    /// `Decision::Deny` (fail-closed, §4.3).
    fn ask(&mut self, app_id: &str, capability: Capability) -> Decision;
}

/// Fail-closed prompter with no display dependency: always denies. This is
/// the default prompter wherever a graphical toolkit is unavailable or the
/// `desktop` feature is not compiled in, and is also the prompter used by
/// the test suite so the pipeline is exercisable without a display server.
#[derive(Debug, Default)]
pub struct HeadlessPrompter;

impl ConsentPrompter for HeadlessPrompter {
    fn ask(&mut self, app_id: &str, capability: Capability) -> Decision {
        tracing::warn!(
            app_id,
            capability = capability.as_str(),
            "no graphical consent prompter available, denying by default"
        );
        Decision::Deny
    }
}

/// A prompter driven by a fixed, pre-recorded sequence of answers. Used by
/// tests to exercise S2/S4-style scenarios without a display.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<Decision>,
    pub asked: Vec<(String, Capability)>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

impl ConsentPrompter for ScriptedPrompter {
    fn ask(&mut self, app_id: &str, capability: Capability) -> Decision {
        self.asked.push((app_id.to_string(), capability));
        self.answers.pop_front().unwrap_or(Decision::Deny)
    }
}

#[cfg(feature = "desktop")]
pub use gui::GuiPrompter;

#[cfg(feature = "desktop")]
mod gui {
    use super::*;

    /// Modal graphical consent dialog backed by `eframe`/`egui`. The
    /// toolkit is not touched until the first call to `ask()` — manifests
    /// with no missing capabilities never pay for window-system init.
    #[derive(Default)]
    pub struct GuiPrompter;

    impl ConsentPrompter for GuiPrompter {
        fn ask(&mut self, app_id: &str, capability: Capability) -> Decision {
            let result = std::sync::Arc::new(std::sync::Mutex::new(Decision::Deny));
            let app_id = app_id.to_string();
            let label = capability.human_label().to_string();

            let options = eframe::NativeOptions {
                viewport: egui::ViewportBuilder::default()
                    .with_inner_size([420.0, 160.0])
                    .with_resizable(false),
                ..Default::default()
            };

            let dialog_result = result.clone();
            let run = eframe::run_native(
                "Allow access?",
                options,
                Box::new(move |_cc| {
                    Ok(Box::new(PromptApp {
                        app_id: app_id.clone(),
                        label: label.clone(),
                        result: dialog_result.clone(),
                        answered: false,
                    }))
                }),
            );

            if run.is_err() {
                // Window-close without an explicit Allow click, or the
                // toolkit failed to start at all: fail closed (§4.3).
                tracing::warn!("consent dialog did not complete normally, denying");
                return Decision::Deny;
            }

            *result.lock().unwrap()
        }
    }

    struct PromptApp {
        app_id: String,
        label: String,
        result: std::sync::Arc<std::sync::Mutex<Decision>>,
        answered: bool,
    }

    impl eframe::App for PromptApp {
        fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.label(format!("\"{}\" wants to {}.", self.app_id, self.label));
                ui.horizontal(|ui| {
                    if ui.button("Deny").clicked() {
                        *self.result.lock().unwrap() = Decision::Deny;
                        self.answered = true;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                    if ui.button("Allow").clicked() {
                        *self.result.lock().unwrap() = Decision::Grant;
                        self.answered = true;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });

            if ctx.input(|i| i.viewport().close_requested()) && !self.answered {
                // Window closed without a click: fail closed.
                *self.result.lock().unwrap() = Decision::Deny;
            }
        }
    }
}
