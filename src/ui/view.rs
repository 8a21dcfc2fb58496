//! State-to-view mapping.
//!
//! [`view_for`] turns a [`WorkflowSnapshot`] into a [`ViewState`] without
//! touching any output; [`render`] pushes a view into a [`DisplaySink`]. The
//! workflow holds no display logic of its own.

use crate::state::{WorkflowSnapshot, WorkflowState};

/// Everything a sink can be asked to show, hide or fill in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    UploadSection,
    FileInfo,
    FileName,
    FileSize,
    Parameters,
    Processing,
    ResultSection,
    MissingCount,
    TotalRows,
    TotalCols,
    ErrorBanner,
}

/// Sections toggled as a whole on each render.
pub const SECTIONS: [Element; 5] = [
    Element::UploadSection,
    Element::FileInfo,
    Element::Processing,
    Element::ResultSection,
    Element::ErrorBanner,
];

/// Output surface for a rendered view.
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySink {
    fn set_text(&mut self, element: Element, text: &str);
    fn show(&mut self, element: Element);
    fn hide(&mut self, element: Element);
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Sections to show; every other entry of [`SECTIONS`] is hidden
    pub visible: Vec<Element>,
    pub texts: Vec<(Element, String)>,
}

impl ViewState {
    pub fn is_visible(&self, element: Element) -> bool {
        self.visible.contains(&element)
    }

    pub fn text(&self, element: Element) -> Option<&str> {
        self.texts
            .iter()
            .find(|(e, _)| *e == element)
            .map(|(_, text)| text.as_str())
    }
}

pub fn view_for(snapshot: &WorkflowSnapshot) -> ViewState {
    let mut view = ViewState::default();

    match snapshot.state {
        WorkflowState::Idle => view.visible.push(Element::UploadSection),
        WorkflowState::FileSelected | WorkflowState::Failed => view.visible.push(Element::FileInfo),
        WorkflowState::Processing => view.visible.push(Element::Processing),
        WorkflowState::ResultReady => view.visible.push(Element::ResultSection),
    }

    if let (Some(name), Some(size)) = (&snapshot.file_name, snapshot.file_size_bytes) {
        view.texts.push((Element::FileName, name.clone()));
        view.texts.push((Element::FileSize, format_file_size(size)));
    }

    view.texts.push((
        Element::Parameters,
        format!(
            "method {}, {} iterations",
            snapshot.params.method(),
            snapshot.params.iterations()
        ),
    ));

    if let Some(stats) = &snapshot.stats {
        view.texts.push((Element::MissingCount, stats.missing_filled.to_string()));
        view.texts.push((Element::TotalRows, stats.total_rows.to_string()));
        view.texts.push((Element::TotalCols, stats.total_cols.to_string()));
    }

    if let Some(message) = &snapshot.last_error {
        view.visible.push(Element::ErrorBanner);
        view.texts.push((Element::ErrorBanner, message.clone()));
    }

    view
}

pub fn render<S: DisplaySink + ?Sized>(view: &ViewState, sink: &mut S) {
    for (element, text) in &view.texts {
        sink.set_text(*element, text);
    }
    for section in SECTIONS {
        if view.is_visible(section) {
            sink.show(section);
        } else {
            sink.hide(section);
        }
    }
}

/// Human-readable size: `0 Bytes`, `1.5 KB`, `10 MB`.
///
/// Base 1024, at most two decimals with trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    while exponent < UNITS.len() - 1 && bytes >= 1u64 << (10 * (exponent + 1)) {
        exponent += 1;
    }
    let value = bytes as f64 / (1u64 << (10 * exponent)) as f64;
    let rounded = (value * 100.0).round() / 100.0;

    let mut number = format!("{:.2}", rounded);
    while number.ends_with('0') {
        number.pop();
    }
    if number.ends_with('.') {
        number.pop();
    }

    format!("{} {}", number, UNITS[exponent])
}
