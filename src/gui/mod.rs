use crate::catalog::CatalogStore;
use crate::executor::{Executor, QueryResult};
use eframe::{App, egui};
use egui::Color32;
use egui_extras::{Column, TableBuilder};
use tokio::runtime::Runtime;

/// A window with a command line, the output log and the last table a command returned.
pub struct Application<S> {
    exe: Executor<S>,
    runtime: Runtime,
    input: String,
    log: Vec<(String, Option<Color32>)>,
    table: Option<QueryResult>,
}

impl<S: CatalogStore + 'static> App for Application<S> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::bottom("command_line").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.monospace(">");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.input)
                        .font(egui::TextStyle::Monospace)
                        .desired_width(f32::INFINITY),
                );
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    self.submit(ctx);
                    response.request_focus();
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let max_rect = ui.max_rect();
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.set_width(max_rect.width() * 0.5);
                    self.draw_log(ui);
                });
                ui.separator();
                ui.vertical(|ui| self.draw_table(ui));
            });
        });
    }
}

impl<S: CatalogStore + 'static> Application<S> {
    pub fn new(exe: Executor<S>, runtime: Runtime) -> Self {
        Self {
            exe,
            runtime,
            input: String::new(),
            log: Vec::new(),
            table: None,
        }
    }

    pub fn launch(self) -> eframe::Result {
        let options = eframe::NativeOptions::default();
        eframe::run_native("Acorn", options, Box::new(|_cc| Ok(Box::new(self))))
    }

    fn submit(&mut self, ctx: &egui::Context) {
        let line = std::mem::take(&mut self.input);
        if line.trim().is_empty() {
            return;
        }
        self.log.push((format!("> {line}"), None));
        let result = self.runtime.block_on(self.exe.run(&line));
        match result {
            QueryResult::Clear => {
                self.log.clear();
                self.table = None;
            }
            QueryResult::Exit => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            QueryResult::Error(message) => self.log.push((message, Some(Color32::RED))),
            QueryResult::Rows {
                title,
                columns,
                rows,
            } => {
                self.log.push((title.clone(), Some(Color32::GREEN)));
                self.table = Some(QueryResult::Rows {
                    title,
                    columns,
                    rows,
                });
            }
            other => self
                .log
                .extend(other.lines().into_iter().map(|line| (line, None))),
        }
    }

    fn draw_log(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (line, color) in &self.log {
                    match color {
                        Some(color) => {
                            ui.colored_label(*color, egui::RichText::new(line).monospace())
                        }
                        None => ui.monospace(line),
                    };
                }
            });
    }

    fn draw_table(&self, ui: &mut egui::Ui) {
        let Some(QueryResult::Rows {
            title,
            columns,
            rows,
        }) = &self.table
        else {
            ui.label("No results yet.");
            return;
        };
        ui.strong(title);
        TableBuilder::new(ui)
            .striped(true)
            .columns(Column::auto().resizable(true), columns.len())
            .header(20.0, |mut header| {
                for column in columns {
                    header.col(|ui| {
                        ui.strong(column);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, rows.len(), |mut row| {
                    let cells = &rows[row.index()];
                    for cell in cells {
                        row.col(|ui| {
                            ui.monospace(cell);
                        });
                    }
                });
            });
    }
}
