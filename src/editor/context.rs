//! State passed to every script invocation.

use std::cell::RefCell;
use std::rc::Rc;

use crate::voxel::Image;

/// The open image and the frame counter.
#[derive(Debug)]
pub struct EditorContext {
    image: Rc<RefCell<Image>>,
    frame: u64,
}

impl EditorContext {
    pub fn new(image: Image) -> Self {
        Self {
            image: Rc::new(RefCell::new(image)),
            frame: 0,
        }
    }

    pub fn image(&self) -> &Rc<RefCell<Image>> {
        &self.image
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn set_frame(&mut self, frame: u64) {
        self.frame = frame;
    }
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new(Image::new())
    }
}
