//! Auto-advancing carousel over catalog slides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::models::FileType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub url: String,
    pub file_type: FileType,
}

impl Slide {
    pub fn new(url: impl Into<String>, mime_type: &str) -> Self {
        Self {
            url: url.into(),
            file_type: FileType::from_mime(mime_type),
        }
    }
}

/// Slide index plus the elapsed time toward the next automatic advance.
///
/// Auto-advance runs only while there is more than one slide and every slide
/// is an image; any other slide type suspends it entirely.
#[derive(Debug, Clone)]
pub struct Carousel {
    slides: Vec<Slide>,
    index: usize,
    interval: Duration,
    elapsed: Duration,
}

impl Carousel {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    pub fn new(slides: Vec<Slide>) -> Self {
        Self::with_interval(slides, Self::DEFAULT_INTERVAL)
    }

    pub fn with_interval(slides: Vec<Slide>, interval: Duration) -> Self {
        Self {
            slides,
            index: 0,
            interval,
            elapsed: Duration::ZERO,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Slide> {
        self.slides.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn auto_advances(&self) -> bool {
        self.slides.len() > 1 && self.slides.iter().all(|s| s.file_type == FileType::Image)
    }

    /// Feed elapsed time. Returns how many slides were advanced.
    pub fn tick(&mut self, delta: Duration) -> usize {
        if !self.auto_advances() || self.interval.is_zero() {
            return 0;
        }

        self.elapsed += delta;
        let mut advanced = 0;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            self.index = (self.index + 1) % self.slides.len();
            advanced += 1;
        }
        advanced
    }

    pub fn next(&mut self) {
        if !self.slides.is_empty() {
            self.go_to((self.index + 1) % self.slides.len());
        }
    }

    pub fn prev(&mut self) {
        if !self.slides.is_empty() {
            let len = self.slides.len();
            self.go_to((self.index + len - 1) % len);
        }
    }

    /// Jump to a slide; out-of-range indexes are ignored. Restarts the timer.
    pub fn go_to(&mut self, index: usize) {
        if index < self.slides.len() {
            self.index = index;
            self.elapsed = Duration::ZERO;
        }
    }
}
