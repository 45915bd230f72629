//! Chart request models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::AppError;

/// Chart geometry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    /// Points joined in sequence order.
    Line,
    /// One bar per x category.
    Bar,
    /// One marker per point.
    Scatter,
}

impl PlotKind {
    /// Capitalized name used in chart titles.
    pub fn title(&self) -> &'static str {
        match self {
            PlotKind::Line => "Line",
            PlotKind::Bar => "Bar",
            PlotKind::Scatter => "Scatter",
        }
    }
}

impl std::str::FromStr for PlotKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(PlotKind::Line),
            "bar" => Ok(PlotKind::Bar),
            "scatter" => Ok(PlotKind::Scatter),
            _ => Err(AppError::UnsupportedPlotKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for PlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlotKind::Line => write!(f, "line"),
            PlotKind::Bar => write!(f, "bar"),
            PlotKind::Scatter => write!(f, "scatter"),
        }
    }
}

/// Chart request, accepted as a form or JSON body.
///
/// `plot_type` stays a string so an unknown kind surfaces as
/// `UnsupportedPlotKind` instead of a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlotRequest {
    /// Logical database id (defaults to the configured default).
    #[serde(default, alias = "db_name")]
    pub database: Option<String>,

    /// Table to chart.
    #[validate(length(min = 1, message = "table_name is required"))]
    pub table_name: String,

    /// Column for the x axis.
    #[validate(length(min = 1, message = "x_column is required"))]
    pub x_column: String,

    /// Column for the y axis.
    #[validate(length(min = 1, message = "y_column is required"))]
    pub y_column: String,

    /// `line`, `bar` or `scatter`.
    pub plot_type: String,

    /// Chart title (defaults to "<Kind> Plot for <table> (<x> vs <y>)").
    #[serde(default)]
    pub title: Option<String>,
}

impl PlotRequest {
    /// Parses the requested plot kind.
    pub fn kind(&self) -> Result<PlotKind, AppError> {
        self.plot_type.parse()
    }

    /// Title to draw, falling back to the generated default.
    pub fn resolved_title(&self, kind: PlotKind) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!(
                "{} Plot for {} ({} vs {})",
                kind.title(),
                self.table_name,
                self.x_column,
                self.y_column
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(plot_type: &str) -> PlotRequest {
        PlotRequest {
            database: None,
            table_name: "projA_run1_summary".into(),
            x_column: "x".into(),
            y_column: "y".into(),
            plot_type: plot_type.into(),
            title: None,
        }
    }

    #[test]
    fn test_parse_plot_kind() {
        assert_eq!("line".parse::<PlotKind>().unwrap(), PlotKind::Line);
        assert_eq!(" Bar ".parse::<PlotKind>().unwrap(), PlotKind::Bar);
        assert_eq!("SCATTER".parse::<PlotKind>().unwrap(), PlotKind::Scatter);
    }

    #[test]
    fn test_unknown_plot_kind_is_error() {
        let err = request("pie").kind().unwrap_err();
        assert!(matches!(err, AppError::UnsupportedPlotKind(k) if k == "pie"));
    }

    #[test]
    fn test_default_title() {
        let req = request("scatter");
        assert_eq!(
            req.resolved_title(PlotKind::Scatter),
            "Scatter Plot for projA_run1_summary (x vs y)"
        );
    }

    #[test]
    fn test_empty_columns_fail_validation() {
        let mut req = request("line");
        req.x_column.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_db_name_alias() {
        let req: PlotRequest = serde_json::from_str(
            r#"{"db_name":"vgo_db_2","table_name":"t","x_column":"a","y_column":"b","plot_type":"bar"}"#,
        )
        .unwrap();
        assert_eq!(req.database.as_deref(), Some("vgo_db_2"));
    }
}
