use ndarray::{Array2, ArrayView2};

/// Summed-area tables over a grayscale plane.
///
/// Both tables carry a zero row and column in front, so entry `[y, x]`
/// holds the sum over `[0, y) x [0, x)`. Any rectangle sum is then four
/// lookups regardless of its size.
pub struct IntegralImage {
    sum: Array2<u64>,
    sq_sum: Array2<u64>,
    width: u32,
    height: u32,
}

impl IntegralImage {
    pub fn new(gray: ArrayView2<'_, u8>) -> Self {
        let (h, w) = gray.dim();
        let mut sum = Array2::<u64>::zeros((h + 1, w + 1));
        let mut sq_sum = Array2::<u64>::zeros((h + 1, w + 1));

        for y in 0..h {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = gray[[y, x]] as u64;
                row_sum += v;
                row_sq += v * v;
                sum[[y + 1, x + 1]] = sum[[y, x + 1]] + row_sum;
                sq_sum[[y + 1, x + 1]] = sq_sum[[y, x + 1]] + row_sq;
            }
        }

        Self {
            sum,
            sq_sum,
            width: w as u32,
            height: h as u32,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum of pixel values in the rectangle. The rectangle must lie inside the image.
    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sum, x, y, w, h)
    }

    /// Sum of squared pixel values in the rectangle.
    pub fn rect_sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sq_sum, x, y, w, h)
    }

    /// Mean and standard deviation of the pixels in the rectangle.
    pub fn mean_std_dev(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let n = (w as u64 * h as u64) as f64;
        let mean = self.rect_sum(x, y, w, h) as f64 / n;
        let variance = self.rect_sq_sum(x, y, w, h) as f64 / n - mean * mean;
        (mean, variance.max(0.0).sqrt())
    }

    fn lookup(table: &Array2<u64>, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        // Additions first: the table is monotone so this never underflows.
        table[[y1, x1]] + table[[y0, x0]] - table[[y0, x1]] - table[[y1, x0]]
    }
}
