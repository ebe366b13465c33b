pub mod axis;
pub mod contour;
pub mod coordinates;
pub mod heikin_ashi;
pub mod primitives;
pub mod scale;
pub mod series;
pub mod types;
pub mod windowing;

pub use axis::{Axis, AxisAnchor, AxisId, AxisPosition, AxisSet};
pub use contour::{ScalarGrid, extract_contour, extract_contours};
pub use coordinates::{AxisCoordinates, CoordinateSystem};
pub use heikin_ashi::{heikin_ashi, update_heikin_ashi};
pub use scale::LinearScale;
pub use series::{
    BandSeries, ListenerId, OhlcBar, OhlcSeries, ScalarSeries, SeriesEvent, SeriesListener,
    TimeSeries,
};
pub use types::{Insets, Viewport};
pub use windowing::VisibleRange;
