//! Widget Registry - Type Names Bound to Validators
//!
//! Diagram generation lives outside the compiler behind `WidgetRenderer`.
//! The registry is built once and only answers: is this widget type known,
//! are its parameters valid, and is its output an image or markup.

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::error::{CompileError, CompileResult};
use crate::xml::{escape_attr, escape_text};

/// Raw widget as authored: `{ "type": ..., "alt"?: ..., ...props }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(flatten)]
    pub props: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetOutput {
    /// SVG, embedded as a data-URI image.
    Image,
    /// Markup, embedded as-is.
    Markup,
}

fn default_width() -> u32 { 400 }
fn default_height() -> u32 { 400 }
fn default_strip_height() -> u32 { 80 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NumberLine {
    pub min: f64,
    pub max: f64,
    pub tick_interval: f64,
    #[serde(default)]
    pub points: Vec<f64>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_strip_height")]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BarChart {
    #[serde(default)]
    pub title: Option<String>,
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub y_max: Option<f64>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CoordinatePlane {
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
    #[serde(default)]
    pub points: Vec<PlotPoint>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FractionModel {
    pub numerator: u32,
    pub denominator: u32,
    #[serde(default)]
    pub shape: FractionShape,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FractionShape {
    #[default]
    Circle,
    Rectangle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataTable {
    #[serde(default)]
    pub caption: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A widget whose parameters passed its registry validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    NumberLine(NumberLine),
    BarChart(BarChart),
    CoordinatePlane(CoordinatePlane),
    FractionModel(FractionModel),
    DataTable(DataTable),
}

impl Widget {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NumberLine(_) => "numberLine",
            Self::BarChart(_) => "barChart",
            Self::CoordinatePlane(_) => "coordinatePlane",
            Self::FractionModel(_) => "fractionModel",
            Self::DataTable(_) => "dataTable",
        }
    }

    pub fn output(&self) -> WidgetOutput {
        match self {
            Self::NumberLine(_)
            | Self::BarChart(_)
            | Self::CoordinatePlane(_)
            | Self::FractionModel(_) => WidgetOutput::Image,
            Self::DataTable(_) => WidgetOutput::Markup,
        }
    }

    /// Pixel size of image widgets.
    pub fn size(&self) -> Option<[u32; 2]> {
        match self {
            Self::NumberLine(w) => Some([w.width, w.height]),
            Self::BarChart(w) => Some([w.width, w.height]),
            Self::CoordinatePlane(w) => Some([w.width, w.height]),
            Self::FractionModel(w) => Some([w.width, w.height]),
            Self::DataTable(_) => None,
        }
    }

    pub fn default_alt(&self) -> String {
        match self {
            Self::NumberLine(w) => format!("Number line from {} to {}", w.min, w.max),
            Self::BarChart(w) => match &w.title {
                Some(title) => format!("Bar chart: {title}"),
                None => "Bar chart".to_string(),
            },
            Self::CoordinatePlane(_) => "Coordinate plane".to_string(),
            Self::FractionModel(w) => {
                format!("Fraction model showing {}/{}", w.numerator, w.denominator)
            }
            Self::DataTable(_) => "Data table".to_string(),
        }
    }
}

type WidgetValidator = fn(Value) -> Result<Widget, String>;

pub struct WidgetDescriptor {
    pub kind: &'static str,
    pub output: WidgetOutput,
    validate: WidgetValidator,
}

/// Widget registry - static table of type name to descriptor
pub struct WidgetRegistry {
    widgets: BTreeMap<&'static str, WidgetDescriptor>,
}

static REGISTRY: LazyLock<WidgetRegistry> = LazyLock::new(WidgetRegistry::builtin);

impl WidgetRegistry {
    pub fn global() -> &'static Self {
        &REGISTRY
    }

    fn builtin() -> Self {
        let mut registry = Self { widgets: BTreeMap::new() };
        registry.register("numberLine", WidgetOutput::Image, validate_number_line);
        registry.register("barChart", WidgetOutput::Image, validate_bar_chart);
        registry.register("coordinatePlane", WidgetOutput::Image, validate_coordinate_plane);
        registry.register("fractionModel", WidgetOutput::Image, validate_fraction_model);
        registry.register("dataTable", WidgetOutput::Markup, validate_data_table);
        registry
    }

    fn register(&mut self, kind: &'static str, output: WidgetOutput, validate: WidgetValidator) {
        self.widgets.insert(kind, WidgetDescriptor { kind, output, validate });
    }

    pub fn get(&self, kind: &str) -> Option<&WidgetDescriptor> {
        self.widgets.get(kind)
    }

    pub fn list(&self) -> Vec<&WidgetDescriptor> {
        self.widgets.values().collect()
    }

    /// Check a raw widget against the validator registered for its type.
    pub fn validate(&self, slot: &str, spec: &WidgetSpec) -> CompileResult<Widget> {
        let descriptor = self.get(&spec.kind).ok_or_else(|| CompileError::UnsupportedVariant {
            category: "widget",
            name: spec.kind.clone(),
        })?;
        (descriptor.validate)(Value::Object(spec.props.clone()))
            .map_err(|message| CompileError::schema(format!("widgets.{slot}"), message))
    }
}

fn parse<T: DeserializeOwned>(props: Value) -> Result<T, String> {
    serde_json::from_value(props).map_err(|e| e.to_string())
}

fn validate_number_line(props: Value) -> Result<Widget, String> {
    let w: NumberLine = parse(props)?;
    if !(w.min < w.max) {
        return Err(format!("min {} must be less than max {}", w.min, w.max));
    }
    if !(w.tick_interval > 0.0) {
        return Err("tickInterval must be positive".to_string());
    }
    if let Some(p) = w.points.iter().find(|p| **p < w.min || **p > w.max) {
        return Err(format!("point {p} lies outside [{}, {}]", w.min, w.max));
    }
    Ok(Widget::NumberLine(w))
}

fn validate_bar_chart(props: Value) -> Result<Widget, String> {
    let w: BarChart = parse(props)?;
    if w.bars.is_empty() {
        return Err("at least one bar is required".to_string());
    }
    if let Some(bar) = w.bars.iter().find(|b| !(b.value >= 0.0) || !b.value.is_finite()) {
        return Err(format!("bar '{}' has invalid value {}", bar.label, bar.value));
    }
    if let Some(y_max) = w.y_max {
        let tallest = w.bars.iter().map(|b| b.value).fold(0.0, f64::max);
        if y_max < tallest {
            return Err(format!("yMax {y_max} is below tallest bar {tallest}"));
        }
    }
    Ok(Widget::BarChart(w))
}

fn validate_coordinate_plane(props: Value) -> Result<Widget, String> {
    let w: CoordinatePlane = parse(props)?;
    if !(w.x_range[0] < w.x_range[1]) || !(w.y_range[0] < w.y_range[1]) {
        return Err("axis ranges must be ascending".to_string());
    }
    Ok(Widget::CoordinatePlane(w))
}

fn validate_fraction_model(props: Value) -> Result<Widget, String> {
    let w: FractionModel = parse(props)?;
    if w.denominator == 0 {
        return Err("denominator must be positive".to_string());
    }
    if w.numerator > w.denominator {
        return Err(format!(
            "numerator {} exceeds denominator {}",
            w.numerator, w.denominator
        ));
    }
    Ok(Widget::FractionModel(w))
}

fn validate_data_table(props: Value) -> Result<Widget, String> {
    let w: DataTable = parse(props)?;
    if w.columns.is_empty() {
        return Err("at least one column is required".to_string());
    }
    if let Some((i, row)) = w.rows.iter().enumerate().find(|(_, r)| r.len() != w.columns.len()) {
        return Err(format!(
            "row {i} has {} cells, expected {}",
            row.len(),
            w.columns.len()
        ));
    }
    Ok(Widget::DataTable(w))
}

/// The external "render widget to markup" capability.
pub trait WidgetRenderer: Send + Sync {
    fn render(&self, widget: &Widget) -> Result<String, String>;
}

/// Stand-in renderer: an empty, correctly sized SVG frame for diagrams and a
/// plain HTML table for data tables.
pub struct PlaceholderRenderer;

impl WidgetRenderer for PlaceholderRenderer {
    fn render(&self, widget: &Widget) -> Result<String, String> {
        match widget {
            Widget::DataTable(table) => Ok(render_table(table)),
            other => {
                let [w, h] = other
                    .size()
                    .ok_or_else(|| format!("{} has no size", other.kind()))?;
                Ok(format!(
                    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}"></svg>"#
                ))
            }
        }
    }
}

fn render_table(table: &DataTable) -> String {
    let mut out = String::from("<table>");
    if let Some(caption) = &table.caption {
        out.push_str(&format!("<caption>{}</caption>", escape_text(caption)));
    }
    out.push_str("<thead><tr>");
    for column in &table.columns {
        out.push_str(&format!("<th>{}</th>", escape_text(column)));
    }
    out.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str(&format!("<td>{}</td>", escape_text(cell)));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

/// Wrap rendered widget output for placement in a slot.
pub fn embed(widget: &Widget, alt: Option<&str>, rendered: String) -> String {
    match widget.output() {
        WidgetOutput::Image => {
            let data = base64::engine::general_purpose::STANDARD.encode(rendered.as_bytes());
            let alt = alt.map_or_else(|| widget.default_alt(), str::to_string);
            let size = widget
                .size()
                .map(|[w, h]| format!(r#" width="{w}" height="{h}""#))
                .unwrap_or_default();
            format!(
                r#"<img src="data:image/svg+xml;base64,{data}" alt="{}"{size}/>"#,
                escape_attr(&alt)
            )
        }
        WidgetOutput::Markup => rendered,
    }
}
