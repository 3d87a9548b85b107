//! Dashboard Template
//!
//! HTML template compiled once at startup and rendered per request.
//! Placeholders use `{{ name }}`; the recognized names are listed in
//! [`Field`].

use std::path::Path;

use tracing::info;

use crate::domain::ports::Metrics;
use crate::error::{Error, Result};

const BUILTIN_TEMPLATE: &str = include_str!("../../templates/index.html");

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Snapshot value a placeholder expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CpuUsage,
    MemoryUsed,
    MemoryTotal,
    DiskUsed,
    DiskTotal,
    SampledAt,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "cpu_usage" => Some(Field::CpuUsage),
            "memory_used" => Some(Field::MemoryUsed),
            "memory_total" => Some(Field::MemoryTotal),
            "disk_used" => Some(Field::DiskUsed),
            "disk_total" => Some(Field::DiskTotal),
            "sampled_at" => Some(Field::SampledAt),
            _ => None,
        }
    }

    fn render(self, m: &Metrics, out: &mut String) {
        match self {
            Field::CpuUsage => out.push_str(&format_percent(m.cpu_usage_percent)),
            Field::MemoryUsed => out.push_str(&m.memory_used_mb.to_string()),
            Field::MemoryTotal => out.push_str(&m.memory_total_mb.to_string()),
            Field::DiskUsed => out.push_str(&m.disk_used_gb.to_string()),
            Field::DiskTotal => out.push_str(&m.disk_total_gb.to_string()),
            Field::SampledAt => out.push_str(
                &m.sampled_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ),
        }
    }
}

/// CPU percent rounded to two decimals, shortest form (42.50 -> "42.5").
pub fn format_percent(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{}", rounded)
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Compiled dashboard template.
#[derive(Debug, Clone)]
pub struct DashboardTemplate {
    segments: Vec<Segment>,
    size_hint: usize,
}

impl DashboardTemplate {
    /// Template shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::compile(BUILTIN_TEMPLATE)
    }

    /// Read and compile a template file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let template = Self::compile(&source)?;
        info!(path = %path.display(), "Loaded dashboard template");
        Ok(template)
    }

    /// Compile template source. Unknown or unterminated placeholders fail.
    pub fn compile(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }

            let after_open = &rest[start + OPEN.len()..];
            let end = after_open.find(CLOSE).ok_or_else(|| Error::Template {
                offset: offset + start,
                reason: "unterminated placeholder".to_string(),
            })?;

            let name = after_open[..end].trim();
            let field = Field::parse(name).ok_or_else(|| Error::Template {
                offset: offset + start,
                reason: format!("unknown placeholder '{}'", name),
            })?;
            segments.push(Segment::Field(field));

            let consumed = start + OPEN.len() + end + CLOSE.len();
            rest = &rest[consumed..];
            offset += consumed;
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            segments,
            size_hint: source.len(),
        })
    }

    /// Fields referenced by the template, in order of appearance.
    pub fn fields(&self) -> Vec<Field> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Field(f) => Some(*f),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Render a snapshot.
    pub fn render(&self, metrics: &Metrics) -> String {
        let mut out = String::with_capacity(self.size_hint + 64);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => field.render(metrics, &mut out),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{DiskUsage, MemoryUsage};
    use assert_matches::assert_matches;

    fn scenario() -> Metrics {
        Metrics::from_readings(
            Some(42.5),
            Some(MemoryUsage::from_mb(2048, 8192)),
            Some(DiskUsage::from_gb(100, 500)),
        )
    }

    #[test]
    fn test_render_fields() {
        let template = DashboardTemplate::compile(
            "cpu={{cpu_usage}} mem={{ memory_used }}/{{memory_total}} disk={{disk_used}}/{{ disk_total }}",
        )
        .unwrap();

        assert_eq!(
            template.render(&scenario()),
            "cpu=42.5 mem=2048/8192 disk=100/500"
        );
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(42.5), "42.5");
        assert_eq!(format_percent(42.0), "42");
        assert_eq!(format_percent(12.3456), "12.35");
        assert_eq!(format_percent(0.0), "0");
    }

    #[test]
    fn test_literal_only() {
        let template = DashboardTemplate::compile("<p>static</p>").unwrap();
        assert!(template.fields().is_empty());
        assert_eq!(template.render(&scenario()), "<p>static</p>");
    }

    #[test]
    fn test_unknown_placeholder() {
        assert_matches!(
            DashboardTemplate::compile("a {{ nope }}"),
            Err(Error::Template { offset: 2, .. })
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert_matches!(
            DashboardTemplate::compile("ok {{cpu_usage}} then {{ disk_used"),
            Err(Error::Template { offset: 22, .. })
        );
    }

    #[test]
    fn test_builtin_template() {
        let template = DashboardTemplate::builtin().unwrap();
        assert_eq!(
            template.fields(),
            vec![
                Field::CpuUsage,
                Field::MemoryUsed,
                Field::MemoryTotal,
                Field::DiskUsed,
                Field::DiskTotal,
                Field::SampledAt,
            ]
        );

        let html = template.render(&scenario());
        assert!(html.contains("42.5%"));
        assert!(html.contains("2048 MB"));
        assert!(html.contains("8192 MB"));
        assert!(html.contains("100 GB"));
        assert!(html.contains("500 GB"));
    }

    #[test]
    fn test_load_missing_file() {
        assert_matches!(
            DashboardTemplate::load(Path::new("/nonexistent/dashboard.html")),
            Err(Error::Io(_))
        );
    }
}
