use crate::dashboard::Dashboard;
use crate::model::{Filter, Pagination, Product, Statistics};
use crate::products::{DeleteState, ProductList};
use crate::worker::{LoadState, Reply, Request, ViewId, Worker};
use chrono::DateTime;
use eframe::egui;
use egui::{
    Color32, Context, FontFamily, FontId, Margin, RichText, Stroke, Vec2, Visuals,
};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Line, Plot, PlotPoints};
use tracing::{debug, info};

const ACCENT: Color32 = Color32::from_rgb(59, 130, 246);
const MUTED: Color32 = Color32::from_rgb(148, 163, 184);
const DANGER: Color32 = Color32::from_rgb(220, 38, 38);
const PANEL: Color32 = Color32::from_rgb(30, 35, 46);

pub fn set_custom_style(ctx: &Context) {
    // Slate dark theme with a blue accent
    let mut visuals = Visuals::dark();

    visuals.panel_fill = Color32::from_rgb(17, 24, 39);
    visuals.window_fill = Color32::from_rgb(31, 41, 55);
    visuals.extreme_bg_color = Color32::from_rgb(15, 23, 42);
    visuals.faint_bg_color = Color32::from_rgb(24, 31, 46);

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(45, 55, 72);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, Color32::from_rgb(75, 85, 99));

    visuals.widgets.hovered.bg_fill = Color32::from_rgb(55, 65, 81);
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT);

    visuals.widgets.active.bg_fill = Color32::from_rgb(37, 99, 235);
    visuals.widgets.active.bg_stroke = Stroke::new(1.0, Color32::from_rgb(147, 197, 253));

    visuals.selection.bg_fill = ACCENT;
    visuals.selection.stroke = Stroke::new(1.0, Color32::WHITE);

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = Margin::same(12);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);

    style.text_styles.insert(
        egui::TextStyle::Body,
        FontId::new(15.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Heading,
        FontId::new(22.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Button,
        FontId::new(15.0, FontFamily::Proportional),
    );

    ctx.set_style(style);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Page {
    Dashboard,
    Products,
}

enum Screen {
    Dashboard(Dashboard),
    Products(ProductList),
}

impl Screen {
    fn page(&self) -> Page {
        match self {
            Screen::Dashboard(_) => Page::Dashboard,
            Screen::Products(_) => Page::Products,
        }
    }

    fn is_busy(&self) -> bool {
        match self {
            Screen::Dashboard(d) => d.is_busy(),
            Screen::Products(p) => p.is_busy(),
        }
    }
}

pub struct AdminApp {
    worker: Worker,
    base_url: String,
    // Bumped on every navigation; replies for an older view are dropped
    view: ViewId,
    screen: Screen,
    search_input: String,
}

impl AdminApp {
    pub fn new(worker: Worker, base_url: String) -> Self {
        let mut app = Self {
            worker,
            base_url,
            view: 0,
            screen: Screen::Dashboard(Dashboard::new()),
            search_input: String::new(),
        };
        app.navigate(Page::Dashboard);
        app
    }

    /// Leaves the current screen and mounts a fresh one.
    fn navigate(&mut self, page: Page) {
        self.view += 1;
        info!(?page, view = self.view, "navigate");

        let requests = match page {
            Page::Dashboard => {
                let mut dashboard = Dashboard::new();
                let requests = dashboard.mount();
                self.screen = Screen::Dashboard(dashboard);
                requests
            }
            Page::Products => {
                let mut list = ProductList::new();
                let request = list.mount();
                self.search_input.clear();
                self.screen = Screen::Products(list);
                vec![request]
            }
        };
        for request in requests {
            self.worker.dispatch(self.view, request);
        }
    }

    fn drain_replies(&mut self) {
        for reply in self.worker.poll() {
            if let Some(request) = self.route(reply) {
                self.worker.dispatch(self.view, request);
            }
        }
    }

    /// Hands a reply to the mounted screen, returning its follow-up request.
    fn route(&mut self, reply: Reply) -> Option<Request> {
        if reply.view != self.view {
            debug!(view = reply.view, seq = reply.seq, "reply for a closed view");
            return None;
        }
        match &mut self.screen {
            Screen::Dashboard(dashboard) => {
                dashboard.handle(reply.seq, reply.outcome);
                None
            }
            Screen::Products(list) => list.handle(reply.seq, reply.outcome),
        }
    }
}

impl eframe::App for AdminApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.drain_replies();

        let mut navigate_to = None;
        let mut pending: Vec<Request> = Vec::new();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading(RichText::new("Admin Panel").strong());
                ui.separator();

                let current = self.screen.page();
                for (page, label) in [(Page::Dashboard, "Dashboard"), (Page::Products, "Products")] {
                    if ui.selectable_label(current == page, label).clicked() && current != page {
                        navigate_to = Some(page);
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(RichText::new(&self.base_url).color(MUTED).small());
                    if self.screen.is_busy() {
                        ui.add(egui::Spinner::new());
                    }
                });
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| match &mut self.screen {
            Screen::Dashboard(dashboard) => {
                pending.extend(dashboard_view(ui, dashboard));
            }
            Screen::Products(list) => {
                pending.extend(products_view(ui, list, &mut self.search_input));
            }
        });

        if let Screen::Products(list) = &mut self.screen {
            pending.extend(delete_modal(ctx, list));
            notice_modal(ctx, list);
        }

        for request in pending {
            self.worker.dispatch(self.view, request);
        }
        if let Some(page) = navigate_to {
            self.navigate(page);
        }
    }
}

fn dashboard_view(ui: &mut egui::Ui, dashboard: &mut Dashboard) -> Option<Request> {
    let mut request = None;

    ui.heading(RichText::new("Dashboard").strong().size(28.0));
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        let stats = dashboard.statistics.stats();
        for (caption, value) in statistic_tiles(&stats) {
            stat_tile(ui, caption, &value);
        }
        if dashboard.statistics.state() == (LoadState::Loaded { stale: true }) {
            ui.label(RichText::new("Statistics unavailable").color(MUTED).italics());
        }
    });

    ui.add_space(12.0);
    egui::Frame::new()
        .fill(PANEL)
        .corner_radius(8.0)
        .inner_margin(Margin::same(16))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.heading(RichText::new("Graph").strong());
                    ui.label(
                        RichText::new("Visualization and analysis of data")
                            .color(MUTED)
                            .small(),
                    );
                });
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let mut selected = dashboard.series.filter();
                    egui::ComboBox::from_id_salt("filter")
                        .selected_text(selected.label())
                        .show_ui(ui, |ui| {
                            for filter in Filter::ALL {
                                ui.selectable_value(&mut selected, filter, filter.label());
                            }
                        });
                    request = dashboard.set_filter(selected);
                    ui.checkbox(&mut dashboard.show_bar_chart, "Show statistics chart");
                });
            });

            ui.add_space(8.0);
            line_chart(ui, dashboard);

            if dashboard.show_bar_chart {
                ui.add_space(12.0);
                statistics_chart(ui, &dashboard.statistics.stats());
            }
        });

    request
}

fn stat_tile(ui: &mut egui::Ui, caption: &str, value: &str) {
    egui::Frame::new()
        .fill(PANEL)
        .stroke(Stroke::new(1.0, Color32::from_rgb(55, 65, 81)))
        .corner_radius(8.0)
        .inner_margin(Margin::same(12))
        .show(ui, |ui| {
            ui.set_min_width(180.0);
            ui.vertical(|ui| {
                ui.label(RichText::new(caption).color(MUTED).small());
                ui.label(RichText::new(value).size(24.0).strong());
            });
        });
}

fn line_chart(ui: &mut egui::Ui, dashboard: &Dashboard) {
    let series = &dashboard.series;
    let points: PlotPoints = series.points().iter().map(|p| [p.x(), p.value]).collect();

    if series.state() == LoadState::Empty {
        ui.label(RichText::new("No data for this period.").color(MUTED));
    }

    Plot::new("line_chart")
        .height(350.0)
        .y_axis_label("Value")
        .x_axis_formatter(|mark, _range| format_date(mark.value))
        .label_formatter(|_name, value| {
            format!("{}\n{}", format_date(value.x), format_number(value.y))
        })
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new("Line Data", points).color(ACCENT).width(2.0));
        });
}

fn statistics_chart(ui: &mut egui::Ui, stats: &Statistics) {
    let bars: Vec<Bar> = statistic_tiles(stats)
        .iter()
        .zip(statistic_values(stats))
        .enumerate()
        .map(|(i, ((caption, _), value))| Bar::new(i as f64, value).name(*caption).width(0.55))
        .collect();

    Plot::new("statistics_chart")
        .height(350.0)
        .y_axis_label("Count")
        .x_axis_formatter(|mark, _range| category_label(mark.value).to_string())
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new("Statistics", bars).color(ACCENT));
        });
}

fn products_view(
    ui: &mut egui::Ui,
    list: &mut ProductList,
    search_input: &mut String,
) -> Vec<Request> {
    let mut requests = Vec::new();

    ui.heading(RichText::new("Products").strong().size(28.0));
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(&mut *search_input)
                .hint_text("Search for products")
                .desired_width(320.0),
        );
        if response.changed() {
            requests.extend(list.set_search(search_input));
        }
        if list.state() == (LoadState::Loaded { stale: true }) {
            ui.label(RichText::new("Could not refresh; showing previous results").color(MUTED));
        }
    });
    ui.add_space(8.0);

    let products = list.products().to_vec();
    let mut delete_clicked = None;

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(true)
        .max_scroll_height(480.0)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::remainder().at_least(160.0).clip(true)) // Name
        .column(Column::exact(100.0)) // Price
        .column(Column::exact(90.0)) // Quantity
        .column(Column::remainder().at_least(200.0).clip(true)) // Description
        .column(Column::exact(90.0)) // Action
        .header(30.0, |mut header| {
            for title in ["NAME", "PRICE", "QUANTITY", "DESCRIPTION", "ACTION"] {
                header.col(|ui| {
                    ui.label(RichText::new(title).color(MUTED).strong().small());
                });
            }
        })
        .body(|mut body| {
            if products.is_empty() {
                body.row(34.0, |mut row| {
                    row.col(|ui| {
                        ui.label(RichText::new(EMPTY_LIST).color(MUTED));
                    });
                    for _ in 0..4 {
                        row.col(|_| {});
                    }
                });
                return;
            }
            for product in &products {
                body.row(34.0, |mut row| {
                    for cell in product_cells(product) {
                        row.col(|ui| {
                            ui.label(cell);
                        });
                    }
                    row.col(|ui| {
                        if ui.button(RichText::new("Delete").color(DANGER)).clicked() {
                            delete_clicked = Some(product.id);
                        }
                    });
                });
            }
        });

    if let Some(id) = delete_clicked {
        list.open_delete(id);
    }

    ui.add_space(8.0);
    requests.extend(pagination_bar(ui, list));
    requests
}

fn pagination_bar(ui: &mut egui::Ui, list: &mut ProductList) -> Option<Request> {
    let pagination = list.pagination();
    let mut request = None;

    ui.horizontal_wrapped(|ui| {
        ui.label(RichText::new(page_label(&pagination)).color(MUTED));
        ui.add_space(16.0);

        if ui
            .add_enabled(list.has_previous(), egui::Button::new("Previous"))
            .clicked()
        {
            request = list.previous_page();
        }
        for slot in page_window(&pagination) {
            let Some(page) = slot else {
                ui.label(RichText::new("…").color(MUTED));
                continue;
            };
            let selected = page == pagination.current_page;
            if ui.selectable_label(selected, page.to_string()).clicked() {
                request = list.request_page(page);
            }
        }
        if ui
            .add_enabled(list.has_next(), egui::Button::new("Next"))
            .clicked()
        {
            request = list.next_page();
        }
    });

    request
}

fn delete_modal(ctx: &Context, list: &mut ProductList) -> Option<Request> {
    let (id, busy) = match list.delete_state() {
        DeleteState::None => return None,
        DeleteState::Confirming(id) => (id, false),
        DeleteState::Deleting(id) => (id, true),
    };
    let mut request = None;

    let response = egui::Modal::new(egui::Id::new(("confirm_delete", id))).show(ctx, |ui| {
        ui.set_width(380.0);
        ui.vertical_centered(|ui| {
            ui.heading(RichText::new(CONFIRM_DELETE).strong());
            ui.add_space(12.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!busy, egui::Button::new("Cancel").min_size(Vec2::new(80.0, 30.0)))
                    .clicked()
                {
                    list.close_delete();
                }
                let yes = egui::Button::new(RichText::new("Yes").color(Color32::WHITE))
                    .fill(DANGER)
                    .min_size(Vec2::new(80.0, 30.0));
                if ui.add_enabled(!busy, yes).clicked() {
                    request = list.confirm_delete();
                }
                if busy {
                    ui.add(egui::Spinner::new());
                }
            });
        });
    });

    if response.should_close() && !busy {
        list.close_delete();
    }
    request
}

fn notice_modal(ctx: &Context, list: &mut ProductList) {
    let Some(message) = list.notice().map(str::to_owned) else {
        return;
    };
    let response = egui::Modal::new(egui::Id::new("notice")).show(ctx, |ui| {
        ui.set_width(320.0);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new(&message).color(DANGER).strong());
            ui.add_space(12.0);
            ui.button("OK").clicked()
        })
        .inner
    });
    if response.inner || response.should_close() {
        list.dismiss_notice();
    }
}

const EMPTY_LIST: &str = "No products found.";
const CONFIRM_DELETE: &str = "Are you sure you want to delete this product?";
const PAGE_RADIUS: u32 = 2;
const CATEGORIES: [&str; 3] = ["Total Products", "Total Quantity", "Average Price"];

fn page_label(pagination: &Pagination) -> String {
    format!(
        "Showing page {} of {}",
        pagination.current_page, pagination.last_page
    )
}

/// Pages shown in the pagination bar: the first and last page plus a few
/// around the current one. `None` marks a gap.
fn page_window(pagination: &Pagination) -> Vec<Option<u32>> {
    let last = pagination.last_page.max(1);
    let current = pagination.current_page.clamp(1, last);
    let from = current.saturating_sub(PAGE_RADIUS).max(1);
    let to = current.saturating_add(PAGE_RADIUS).min(last);

    let mut slots = Vec::new();
    if from > 1 {
        slots.push(Some(1));
        if from > 2 {
            slots.push(None);
        }
    }
    slots.extend((from..=to).map(Some));
    if to < last {
        if to + 1 < last {
            slots.push(None);
        }
        slots.push(Some(last));
    }
    slots
}

/// Prints numbers the way the API sent them: `9.99`, `5`, `0.5`.
fn format_number(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        "-".to_string()
    }
}

fn format_quantity(value: f64) -> String {
    if value.is_finite() {
        format!("{}", value.round() as i64)
    } else {
        "-".to_string()
    }
}

/// Chart tick/tooltip label for an x value in epoch seconds.
fn format_date(secs: f64) -> String {
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
        .map(|dt| dt.format("%d %b %Y").to_string())
        .unwrap_or_default()
}

fn product_cells(product: &Product) -> [String; 4] {
    [
        product.name.clone(),
        format_number(product.price),
        format_quantity(product.quantity),
        product.description.clone(),
    ]
}

fn statistic_values(stats: &Statistics) -> [f64; 3] {
    [stats.total_products, stats.total_quantity, stats.average_price]
}

fn statistic_tiles(stats: &Statistics) -> [(&'static str, String); 3] {
    [
        (CATEGORIES[0], format_number(stats.total_products)),
        (CATEGORIES[1], format_number(stats.total_quantity)),
        (CATEGORIES[2], format!("{:.2}", stats.average_price)),
    ]
}

fn category_label(x: f64) -> &'static str {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return "";
    }
    CATEGORIES.get(idx as usize).copied().unwrap_or("")
}
