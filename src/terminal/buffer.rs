use crate::terminal::{Cell, Style};

/// A grid of cells the size of the screen.
/// Surfaces write into this instead of directly to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBuffer {
    cells: Vec<Cell>,
    width: u16,
    height: u16,
}

impl CellBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            cells: vec![Cell::default(); width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn set(&mut self, x: i32, y: i32, ch: char, style: Style) -> bool {
        match self.index(x, y) {
            Some(index) => {
                self.cells[index] = Cell { ch, style };
                true
            }
            None => false,
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|index| self.cells[index])
    }

    pub fn clear(&mut self) -> &mut Self {
        self.cells.fill(Cell::default());
        self
    }

    /// Resizes the grid, keeping the overlapping top-left region.
    pub fn resize(&mut self, width: u16, height: u16) -> &mut Self {
        let mut resized = CellBuffer::new(width, height);
        for y in 0..height.min(self.height) as i32 {
            for x in 0..width.min(self.width) as i32 {
                if let Some(cell) = self.get(x, y) {
                    resized.set(x, y, cell.ch, cell.style);
                }
            }
        }
        *self = resized;
        self
    }

    /// Cells of `self` that differ from `previous`, row-major.
    /// Every cell is reported when the sizes differ.
    pub fn diff<'a>(&'a self, previous: &'a CellBuffer) -> impl Iterator<Item = (u16, u16, Cell)> + 'a {
        let same_size = self.size() == previous.size();
        let width = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(move |(index, cell)| !same_size || previous.cells[*index] != **cell)
            .map(move |(index, cell)| ((index % width) as u16, (index / width) as u16, *cell))
    }

    /// Row `y` as a string, for tests and debugging.
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width as i32)
            .filter_map(|x| self.get(x, y as i32))
            .map(|cell| cell.ch)
            .collect()
    }
}
