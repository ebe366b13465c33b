use crate::error::{ChartError, ChartResult};

/// Affine map from a value domain onto a pixel range.
///
/// The pixel range may be reversed (`range_start > range_end`), which is how
/// value axes express "larger value, smaller Y". A zero-width domain maps every
/// value to the middle of the pixel range instead of dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
    range_start: f64,
    range_end: f64,
}

impl LinearScale {
    pub fn new(
        domain_start: f64,
        domain_end: f64,
        range_start: f64,
        range_end: f64,
    ) -> ChartResult<Self> {
        if !domain_start.is_finite()
            || !domain_end.is_finite()
            || !range_start.is_finite()
            || !range_end.is_finite()
        {
            return Err(ChartError::InvalidData(
                "scale domain and range must be finite".to_owned(),
            ));
        }

        Ok(Self::new_unchecked(
            domain_start,
            domain_end,
            range_start,
            range_end,
        ))
    }

    pub(crate) const fn new_unchecked(
        domain_start: f64,
        domain_end: f64,
        range_start: f64,
        range_end: f64,
    ) -> Self {
        Self {
            domain_start,
            domain_end,
            range_start,
            range_end,
        }
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    #[must_use]
    pub fn range(self) -> (f64, f64) {
        (self.range_start, self.range_end)
    }

    #[must_use]
    pub fn is_degenerate(self) -> bool {
        self.domain_end == self.domain_start
    }

    #[inline]
    #[must_use]
    pub fn map(self, value: f64) -> f64 {
        let span = self.domain_end - self.domain_start;
        let normalized = if span == 0.0 {
            0.5
        } else {
            (value - self.domain_start) / span
        };
        self.range_start + normalized * (self.range_end - self.range_start)
    }

    /// Inverse of [`LinearScale::map`]. A degenerate domain inverts to its
    /// single value; a zero-length pixel range inverts to the domain start.
    #[inline]
    #[must_use]
    pub fn invert(self, pixel: f64) -> f64 {
        if self.is_degenerate() {
            return self.domain_start;
        }
        let pixel_span = self.range_end - self.range_start;
        if pixel_span == 0.0 {
            return self.domain_start;
        }
        let normalized = (pixel - self.range_start) / pixel_span;
        self.domain_start + normalized * (self.domain_end - self.domain_start)
    }

    /// Pixel length of a domain span; sign follows the range direction.
    #[inline]
    #[must_use]
    pub fn scale_span(self, span: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        span * (self.range_end - self.range_start) / (self.domain_end - self.domain_start)
    }
}
