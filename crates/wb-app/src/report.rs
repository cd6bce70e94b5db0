//! Standalone HTML reports built over the read-only session contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use wb_core::{DataSessionProvider, GroupCount, Summary};
use wb_views::escape_html;

/// Label for the bucket collecting groups past `max_groups`
pub const OTHER_BUCKET: &str = "(other)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Horizontal bars scaled to the largest group
    #[default]
    Bar,
    /// Plain value and count table
    Table,
}

/// One grouped chart in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportChart {
    pub title: String,
    /// Raw field key or display name
    pub field: String,
    #[serde(default)]
    pub kind: ChartKind,
    #[serde(default = "default_max_groups")]
    pub max_groups: usize,
}

fn default_max_groups() -> usize {
    10
}

impl ReportChart {
    pub fn bar(title: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            field: field.into(),
            kind: ChartKind::Bar,
            max_groups: default_max_groups(),
        }
    }

    pub fn table(title: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            kind: ChartKind::Table,
            ..Self::bar(title, field)
        }
    }

    pub fn with_max_groups(mut self, max_groups: usize) -> Self {
        self.max_groups = max_groups.max(1);
        self
    }
}

/// Keep the largest `max_groups` buckets and fold the rest into
/// [`OTHER_BUCKET`]
pub fn top_groups(summary: &Summary, max_groups: usize) -> Vec<GroupCount> {
    let mut groups: Vec<GroupCount> = summary.rows.iter().take(max_groups).cloned().collect();
    let rest: usize = summary.rows.iter().skip(max_groups).map(|g| g.count).sum();
    if rest > 0 {
        groups.push(GroupCount {
            value: OTHER_BUCKET.to_string(),
            count: rest,
        });
    }
    groups
}

/// Builds an HTML report from any [`DataSessionProvider`]
pub struct ReportBuilder<'a, P: DataSessionProvider> {
    provider: &'a P,
    title: String,
    charts: Vec<ReportChart>,
    generated_at: DateTime<Utc>,
}

impl<'a, P: DataSessionProvider> ReportBuilder<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            title: "Workbench report".to_string(),
            charts: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn chart(mut self, chart: ReportChart) -> Self {
        self.charts.push(chart);
        self
    }

    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }

    /// Render the report, or `None` when no dataset is loaded
    pub fn build(&self) -> Option<String> {
        let snapshot = self.provider.current_session_data()?;

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
        html.push_str(&format!("<title>{}</title>", escape_html(&self.title)));
        html.push_str(REPORT_CSS);
        html.push_str("</head><body>\n");
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&self.title)));
        html.push_str(&format!(
            "<p class=\"meta\">{} &middot; {} rows &middot; generated {}</p>\n",
            escape_html(&snapshot.source_name),
            snapshot.rows.len(),
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));

        let mut rendered = 0;
        for chart in &self.charts {
            let Some(summary) = self.provider.compute_group_and_count(&chart.field) else {
                warn!(field = %chart.field, "Skipping chart for unknown field");
                continue;
            };
            let label = snapshot.display_name(&summary.field);
            html.push_str(&render_chart(chart, label, &summary));
            rendered += 1;
        }

        if rendered == 0 {
            html.push_str("<p>No charts.</p>\n");
        }
        html.push_str("</body></html>\n");

        debug!(charts = rendered, "Built report");
        Some(html)
    }
}

fn render_chart(chart: &ReportChart, label: &str, summary: &Summary) -> String {
    let groups = top_groups(summary, chart.max_groups);
    let max = groups.iter().map(|g| g.count).max().unwrap_or(0).max(1);

    let mut out = format!(
        "<section><h2>{}</h2><table><tr><th>{}</th><th>Count</th>",
        escape_html(&chart.title),
        escape_html(label)
    );
    if chart.kind == ChartKind::Bar {
        out.push_str("<th></th>");
    }
    out.push_str("</tr>\n");

    for group in &groups {
        out.push_str(&format!(
            "<tr><td>{}</td><td class=\"num\">{}</td>",
            escape_html(&group.value),
            group.count
        ));
        if chart.kind == ChartKind::Bar {
            let width = group.count * 100 / max;
            out.push_str(&format!("<td><div class=\"bar\" style=\"width:{}%\"></div></td>", width));
        }
        out.push_str("</tr>\n");
    }

    out.push_str("</table></section>\n");
    out
}

const REPORT_CSS: &str = "<style>\
body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin-bottom:1.5em}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}\
td.num{text-align:right}\
.bar{background:#4a7fb5;height:12px;min-width:1px}\
.meta{color:#666}\
</style>";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use indexmap::IndexMap;
    use wb_core::{Row, Scalar, SessionSnapshot};

    struct FakeProvider {
        snapshot: Option<SessionSnapshot>,
    }

    impl FakeProvider {
        fn with_values(values: &[&str]) -> Self {
            let rows = values
                .iter()
                .map(|v| {
                    let mut row = Row::new();
                    row.insert("Custom Field 1".to_string(), Scalar::from(*v));
                    row
                })
                .collect();
            let mut display_names = IndexMap::new();
            display_names.insert("Custom Field 1".to_string(), "SBU".to_string());

            Self {
                snapshot: Some(SessionSnapshot {
                    fields: vec!["Custom Field 1".to_string()],
                    rows,
                    visible_fields: vec!["Custom Field 1".to_string()],
                    display_names,
                    source_name: "fails <q1>.csv".to_string(),
                }),
            }
        }
    }

    impl DataSessionProvider for FakeProvider {
        fn current_session_data(&self) -> Option<SessionSnapshot> {
            self.snapshot.clone()
        }

        fn compute_group_and_count(&self, field: &str) -> Option<Summary> {
            let snapshot = self.snapshot.as_ref()?;
            let field = if field == "SBU" { "Custom Field 1" } else { field };
            if !snapshot.fields.iter().any(|f| f == field) {
                return None;
            }
            let mut counts: IndexMap<String, usize> = IndexMap::new();
            for row in &snapshot.rows {
                *counts.entry(row[field].as_display()).or_default() += 1;
            }
            let mut rows: Vec<GroupCount> = counts
                .into_iter()
                .map(|(value, count)| GroupCount { value, count })
                .collect();
            rows.sort_by(|a, b| b.count.cmp(&a.count));
            Some(Summary {
                field: field.to_string(),
                rows,
            })
        }
    }

    #[test]
    fn test_no_dataset_builds_nothing() {
        let provider = FakeProvider { snapshot: None };
        assert!(ReportBuilder::new(&provider).build().is_none());
    }

    #[test]
    fn test_report_uses_display_names_and_escapes() {
        let provider = FakeProvider::with_values(&["Indiana", "Indiana", "Ohio"]);
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let html = ReportBuilder::new(&provider)
            .title("Q1 <fails>")
            .chart(ReportChart::bar("By unit", "SBU"))
            .chart(ReportChart::table("Missing", "Nope"))
            .generated_at(at)
            .build()
            .unwrap();

        assert!(html.contains("<h1>Q1 &lt;fails&gt;</h1>"));
        assert!(html.contains("fails &lt;q1&gt;.csv"));
        assert!(html.contains("2024-03-01 09:30 UTC"));
        assert!(html.contains("<th>SBU</th>"));
        assert!(html.contains("<td>Indiana</td><td class=\"num\">2</td>"));
        assert!(html.contains("width:100%"));
        assert!(html.contains("width:50%"));
        assert!(!html.contains("Missing"));
    }

    #[test]
    fn test_top_groups_folds_rest() {
        let summary = Summary {
            field: "f".to_string(),
            rows: vec![
                GroupCount { value: "a".into(), count: 5 },
                GroupCount { value: "b".into(), count: 3 },
                GroupCount { value: "c".into(), count: 2 },
                GroupCount { value: "d".into(), count: 1 },
            ],
        };

        let groups = top_groups(&summary, 2);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[2].value, OTHER_BUCKET);
        assert_eq!(groups[2].count, 3);
        assert_eq!(top_groups(&summary, 10).len(), 4);
    }

    #[test]
    fn test_chart_serde_defaults() {
        let chart: ReportChart = serde_json::from_str(r#"{"title":"T","field":"Dept"}"#).unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.max_groups, 10);
    }
}
