// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// What the detail view shows in its image pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryImage<'a> {
    Image(&'a str),
    None,
}

/// Circular position within the selected listing's images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GalleryCursor {
    index: usize,
}

impl GalleryCursor {
    pub fn index(self) -> usize {
        self.index
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.index = (self.index % len + 1) % len;
    }

    pub fn previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.index = (self.index % len + len - 1) % len;
    }

    pub fn select(&mut self, index: usize, len: usize) {
        if index < len {
            self.index = index;
        }
    }

    /// The image under the cursor. An index past a shrunken sequence wraps
    /// rather than faulting.
    pub fn current<'a>(self, images: &'a [String]) -> GalleryImage<'a> {
        if images.is_empty() {
            return GalleryImage::None;
        }
        GalleryImage::Image(&images[self.index % images.len()])
    }
}
