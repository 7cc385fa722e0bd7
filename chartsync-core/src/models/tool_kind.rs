use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! tool_kinds {
    ($($variant:ident),+ $(,)?) => {
        /// The closed set of drawing-tool kinds a platform keeps templates for.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum ToolKind {
            $($variant),+
        }

        impl ToolKind {
            /// Every known tool kind, in catalog order.
            pub const ALL: &'static [ToolKind] = &[$(ToolKind::$variant),+];

            /// Platform identifier, e.g. `LineToolRectangle`.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ToolKind::$variant => concat!("LineTool", stringify!($variant))),+
                }
            }
        }
    };
}

tool_kinds! {
    // Lines
    TrendLine, Ray, InfoLine, Extended, TrendAngle, HorzLine, HorzRay, VertLine, CrossLine,
    // Fib
    FibRetracement, TrendBasedFibExtension, FibChannel, FibTimeZone, FibSpeedResistanceFan,
    TrendBasedFibTime, FibCircles, FibSpiral, FibSpeedResistanceArcs, FibWedge, Pitchfan,
    // Gann
    GannSquare, GannFixed, GannComplex, GannFan,
    // Projection
    RiskRewardLong, RiskRewardShort,
    // Brushes
    Brush, Highlighter,
    // Arrows
    ArrowMarker, Arrow, ArrowMarkUp, ArrowMarkDown,
    // Shapes
    Rectangle, RotatedRectangle, Path, Circle, Ellipse, Polyline, Triangle, Arc, BezierQuadro,
    BezierCubic,
    // Text
    Text, TextAbsolute, TextNote, PriceNote, Note, Table, Callout, Comment, PriceLabel, Signpost,
}

impl ToolKind {
    /// Short human label without the `LineTool` prefix.
    pub fn label(&self) -> &'static str {
        &self.as_str()["LineTool".len()..]
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    /// Accepts the full identifier (`LineToolRectangle`) or the short label
    /// (`rectangle`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        let wanted = wanted.strip_prefix("linetool").unwrap_or(&wanted);
        ToolKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.label().to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown tool kind '{}'", s))
    }
}

/// Tool identifier as found in a backup document.
///
/// Identifiers outside [`ToolKind`] are kept verbatim so that imports never
/// drop data, but they only surface under a generic grouping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolId(String);

impl ToolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The known tool kind, if this identifier is part of the catalog.
    pub fn kind(&self) -> Option<ToolKind> {
        ToolKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == self.0)
    }
}

impl From<ToolKind> for ToolId {
    fn from(kind: ToolKind) -> Self {
        Self(kind.as_str().to_string())
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_size_and_names() {
        assert_eq!(ToolKind::ALL.len(), 52);
        assert_eq!(ToolKind::Rectangle.as_str(), "LineToolRectangle");
        assert_eq!(ToolKind::TrendLine.label(), "TrendLine");
        assert_eq!(format!("{}", ToolKind::Signpost), "LineToolSignpost");
    }

    #[test]
    fn test_tool_kind_from_str() {
        assert_eq!(
            ToolKind::from_str("LineToolRectangle").unwrap(),
            ToolKind::Rectangle
        );
        assert_eq!(ToolKind::from_str("rectangle").unwrap(), ToolKind::Rectangle);
        assert_eq!(
            ToolKind::from_str("FIBRETRACEMENT").unwrap(),
            ToolKind::FibRetracement
        );
        assert!(ToolKind::from_str("LineToolLaser").is_err());
        assert!(ToolKind::from_str("").is_err());
    }

    #[test]
    fn test_tool_id_known_and_unknown() {
        let known = ToolId::new("LineToolCircle");
        assert_eq!(known.kind(), Some(ToolKind::Circle));

        let unknown = ToolId::new("LineToolFromTheFuture");
        assert_eq!(unknown.kind(), None);
        assert_eq!(unknown.as_str(), "LineToolFromTheFuture");
    }

    #[test]
    fn test_tool_id_serializes_as_plain_string() {
        let id = ToolId::from(ToolKind::Ray);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"LineToolRay\"");
    }
}
