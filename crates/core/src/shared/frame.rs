use ndarray::ArrayView2;

/// A single captured frame: an interleaved color plane for display plus a
/// spatially aligned grayscale plane for detection.
///
/// The color plane may have 1, 3 (RGB) or 4 (RGBA) channels. Detection only
/// ever reads the gray plane; annotation only ever writes the color plane.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    gray: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    /// Builds a frame from a color plane, deriving the gray plane from it.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        let gray = luma(&data, channels);
        Self {
            data,
            gray,
            width,
            height,
            channels,
            index,
        }
    }

    /// Builds a frame from planes the capture device already produced.
    pub fn from_planes(
        data: Vec<u8>,
        gray: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        index: usize,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        debug_assert_eq!(
            gray.len(),
            (width as usize) * (height as usize),
            "gray length must equal width * height"
        );
        Self {
            data,
            gray,
            width,
            height,
            channels,
            index,
        }
    }

    /// Single-channel frame whose color plane is a copy of the gray plane.
    pub fn from_gray(gray: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        let data = gray.clone();
        Self::from_planes(data, gray, width, height, 1, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn gray(&self) -> &[u8] {
        &self.gray
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn min_dimension(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn gray_ndarray(&self) -> ArrayView2<'_, u8> {
        ArrayView2::from_shape((self.height as usize, self.width as usize), &self.gray)
            .expect("Frame gray length must match dimensions")
    }
}

/// BT.601 luma with integer weights; alpha is ignored.
fn luma(data: &[u8], channels: u8) -> Vec<u8> {
    let channels = channels as usize;
    if channels < 3 {
        return data.iter().step_by(channels.max(1)).copied().collect();
    }
    data.chunks_exact(channels)
        .map(|px| {
            let y = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
            ((y + 500) / 1000) as u8
        })
        .collect()
}
