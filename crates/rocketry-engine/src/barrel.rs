/// Horizontal tier of each placement: `0` left, `1` center, `2` right.
const HORIZONTAL_TIERS: [u8; BarrelSchedule::PERIOD] = [2, 1, 2, 0, 1, 0, 0, 1, 2, 0, 1, 2];
/// Vertical tier of each placement: `0` upper, `1` lower.
const VERTICAL_TIERS: [u8; BarrelSchedule::PERIOD] = [1, 1, 1, 0, 1, 0, 1, 0, 0, 1, 0, 0];

/// Deterministic sequence of fuel barrel placements.
///
/// Placements cycle with a period of 12. The cursor is advanced *before* each
/// lookup, so a freshly reset schedule places its first barrel at index 1.
///
/// ```
/// use rocketry_engine::BarrelSchedule;
///
/// let mut schedule = BarrelSchedule::new(800.0, 600.0);
/// assert_eq!(schedule.position(), (400.0, 390.0));
/// schedule.advance();
/// assert_eq!(schedule.position(), (640.0, 390.0));
/// ```
#[derive(Debug, Clone)]
pub struct BarrelSchedule {
    width: f64,
    height: f64,
    cursor: usize,
    position: (f64, f64),
}

impl BarrelSchedule {
    pub const PERIOD: usize = 12;

    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        let mut this = Self {
            width,
            height,
            cursor: 0,
            position: (0.0, 0.0),
        };
        this.reset();
        this
    }

    /// Returns to the start of the cycle and places the first barrel.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.advance();
    }

    /// Moves the barrel to the next placement in the cycle.
    pub fn advance(&mut self) {
        self.cursor += 1;
        self.position = self.placement(self.cursor);
    }

    /// Current barrel center.
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    /// Number of barrels collected since the last reset.
    #[must_use]
    pub fn collected(&self) -> usize {
        self.cursor - 1
    }

    fn placement(&self, cursor: usize) -> (f64, f64) {
        let i = cursor % Self::PERIOD;
        let horizontal = f64::from(HORIZONTAL_TIERS[i]);
        let vertical = f64::from(VERTICAL_TIERS[i]);
        (
            self.width * 0.2 + self.width * 0.6 * horizontal / 2.0,
            self.height * 0.55 + self.height * 0.1 * vertical,
        )
    }
}
