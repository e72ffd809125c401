use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use himalaya_dash::data::filter::SeasonFilter;
use himalaya_dash::views::overview::{peak_details, peak_summary};

use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Left side panel – selectors and peak facts
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            peak_selector(ui, state);
            ui.separator();
            year_sliders(ui, state);
            ui.separator();
            season_selector(ui, state);
            ui.separator();
            peak_facts(ui, state);
        });
}

fn peak_selector(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Peak");
    if state.peak_options.is_empty() {
        ui.label("No peak has enough expeditions.");
        return;
    }

    let current = state.selected_peak.clone().unwrap_or_default();
    let current_label = state
        .peak_options
        .iter()
        .find(|(id, _)| *id == current)
        .map(|(_, label)| label.clone())
        .unwrap_or(current.clone());

    let mut chosen = None;
    egui::ComboBox::from_id_salt("peak_selector")
        .selected_text(current_label)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for (id, label) in &state.peak_options {
                if ui.selectable_label(*id == current, label).clicked() {
                    chosen = Some(id.clone());
                }
            }
        });
    if let Some(id) = chosen {
        state.select_peak(id);
    }
}

fn year_sliders(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Years");
    let (min, max) = state.year_limits;
    let (mut from, mut to) = state.filters.year_range;

    let from_changed = ui
        .add(egui::Slider::new(&mut from, min..=max).text("from"))
        .changed();
    let to_changed = ui
        .add(egui::Slider::new(&mut to, min..=max).text("to"))
        .changed();

    if from_changed || to_changed {
        state.set_year_range(from, to);
    }
}

fn season_selector(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Season");
    let current = state.filters.season.clone();

    let mut chosen = None;
    egui::ComboBox::from_id_salt("season_selector")
        .selected_text(current.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            if ui
                .selectable_label(current == SeasonFilter::All, "All")
                .clicked()
            {
                chosen = Some(SeasonFilter::All);
            }
            for season in &state.seasons {
                let option = SeasonFilter::Only(season.clone());
                let mut text = RichText::new(season);
                if let Some(cm) = &state.season_colors {
                    text = text.color(cm.color_for(season));
                }
                if ui.selectable_label(current == option, text).clicked() {
                    chosen = Some(option);
                }
            }
        });
    if let Some(season) = chosen {
        state.set_season(season);
    }
}

/// Static peak information and the filtered headline numbers.
fn peak_facts(ui: &mut Ui, state: &AppState) {
    let (Some(ds), Some(peak)) = (&state.dataset, &state.selected_peak) else {
        return;
    };

    ui.heading("Peak Information");
    match peak_details(&ds.merged.records, peak) {
        Some(details) => {
            let info = &details.info;
            ui.label(format!("Name: {}", info.name.as_deref().unwrap_or("Unknown")));
            if let Some(h) = info.height_m {
                ui.label(format!("Height: {h:.0} m"));
            }
            if let Some(himal) = &info.himal {
                ui.label(format!("Range: {himal}"));
            }
            if let Some(region) = &info.region {
                ui.label(format!("Region: {region}"));
            }
            if let Some(c) = details.coords {
                ui.label(format!("Coordinates: {:.4}, {:.4}", c.latitude, c.longitude));
            }
        }
        None => {
            ui.label(format!("No information for {peak}."));
        }
    }

    ui.add_space(6.0);
    ui.heading("Statistics");
    let summary = peak_summary(state.year_records(), peak);
    ui.label(format!("Total expeditions: {}", summary.total_expeditions));
    ui.label(format!("Success rate: {:.1}%", summary.success_rate * 100.0));
    match summary.avg_duration {
        Some(days) => ui.label(format!("Average duration: {days:.1} days")),
        None => ui.label("Average duration: n/a"),
    };
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu, dataset counts and tab switcher.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open data folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} expeditions loaded, {} in filter",
                ds.merged.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });

    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            ui.selectable_value(&mut state.active_tab, tab, tab.title());
        }
    });
}

// ---------------------------------------------------------------------------
// Folder dialog
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open expedition data folder")
        .set_directory(&state.data_dir)
        .pick_folder();

    if let Some(dir) = folder {
        log::info!("Opening data folder {}", dir.display());
        state.open_dir(dir);
    }
}
