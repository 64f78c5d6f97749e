//! Growing prefixes of a price series.
//!
//! Every position `i` of an N-bar series yields one window whose prefix is
//! `series[..=i]`. Prefixes are borrowed slices, so splitting costs O(N)
//! memory rather than materializing every prefix.

use crate::domain::price_bar::PriceBar;

#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    pub index: usize,
    pub prefix: &'a [PriceBar],
}

impl<'a> Window<'a> {
    /// History visible to the entry decision: the prefix without its last
    /// `period_days` bars. Empty while the prefix is not longer than the period.
    pub fn lookback(&self, period_days: usize) -> &'a [PriceBar] {
        if self.prefix.len() > period_days {
            &self.prefix[..self.prefix.len() - period_days]
        } else {
            &[]
        }
    }

    /// Up to `period_days` bars ending at `index`. Never empty.
    pub fn evaluation(&self, period_days: usize) -> &'a [PriceBar] {
        let start = (self.index + 1).saturating_sub(period_days);
        &self.prefix[start..]
    }
}

/// Window at `index`. Panics if `index` is out of range.
pub fn window_at(series: &[PriceBar], index: usize) -> Window<'_> {
    Window {
        index,
        prefix: &series[..=index],
    }
}

pub fn split(series: &[PriceBar]) -> Prefixes<'_> {
    Prefixes { series, next: 0 }
}

pub struct Prefixes<'a> {
    series: &'a [PriceBar],
    next: usize,
}

impl<'a> Iterator for Prefixes<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.series.len() {
            return None;
        }
        let window = window_at(self.series, self.next);
        self.next += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.series.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Prefixes<'_> {}
