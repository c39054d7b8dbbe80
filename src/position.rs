// ============================================================================
// PLACEMENT GEOMETRY — named positions, mark / text tables, proportional scale
// ============================================================================

/// Horizontal distance kept from the left / right canvas edge.
pub const SIDE_MARGIN: f32 = 10.0;
/// Distance kept from the top edge for every top-row position.
pub const TOP_MARGIN: f32 = 50.0;

/// One of the nine fixed anchor keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum NamedPosition {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl NamedPosition {
    pub fn all() -> &'static [NamedPosition] {
        &[
            NamedPosition::TopLeft,
            NamedPosition::TopCenter,
            NamedPosition::TopRight,
            NamedPosition::MiddleLeft,
            NamedPosition::Center,
            NamedPosition::MiddleRight,
            NamedPosition::BottomLeft,
            NamedPosition::BottomCenter,
            NamedPosition::BottomRight,
        ]
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            NamedPosition::TopLeft      => "top_left",
            NamedPosition::TopCenter    => "top_center",
            NamedPosition::TopRight     => "top_right",
            NamedPosition::MiddleLeft   => "middle_left",
            NamedPosition::Center       => "center",
            NamedPosition::MiddleRight  => "middle_right",
            NamedPosition::BottomLeft   => "bottom_left",
            NamedPosition::BottomCenter => "bottom_center",
            NamedPosition::BottomRight  => "bottom_right",
        }
    }

    /// Look up a keyword. Unknown keywords fall through to `top_left`,
    /// the default row of both placement tables.
    pub fn from_keyword(s: &str) -> NamedPosition {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.keyword() == s)
            .unwrap_or_default()
    }

    /// Vertically centred rows; the text table offsets these downward.
    fn is_middle_row(&self) -> bool {
        matches!(
            self,
            NamedPosition::Center | NamedPosition::MiddleLeft | NamedPosition::MiddleRight
        )
    }
}

impl std::fmt::Display for NamedPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Where to place a mark or a text run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Position {
    Named(NamedPosition),
    /// Explicit pixel coordinates, used verbatim.
    At(i32, i32),
}

impl Default for Position {
    fn default() -> Self {
        Position::Named(NamedPosition::TopLeft)
    }
}

impl From<NamedPosition> for Position {
    fn from(p: NamedPosition) -> Self {
        Position::Named(p)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Position::At(x, y)
    }
}

impl From<&str> for Position {
    fn from(s: &str) -> Self {
        Position::Named(NamedPosition::from_keyword(s))
    }
}

impl std::str::FromStr for Position {
    type Err = String;

    /// Accepts a keyword (`bottom_right`) or an `X,Y` pair (`120,40`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((x, y)) = s.split_once(',') {
            let x = x.trim().parse::<i32>().map_err(|e| format!("bad x in '{}': {}", s, e))?;
            let y = y.trim().parse::<i32>().map_err(|e| format!("bad y in '{}': {}", s, e))?;
            return Ok(Position::At(x, y));
        }
        match NamedPosition::all().iter().find(|p| p.keyword() == s) {
            Some(p) => Ok(Position::Named(*p)),
            None => Err(format!("unknown position '{}'", s)),
        }
    }
}

impl Position {
    /// Top-left corner for a `w`×`h` mark on a `canvas_w`×`canvas_h` canvas.
    pub fn resolve_mark(&self, canvas_w: f32, canvas_h: f32, w: f32, h: f32) -> (f32, f32) {
        match *self {
            Position::Named(p) => mark_position(p, canvas_w, canvas_h, w, h),
            Position::At(x, y) => (x as f32, y as f32),
        }
    }

    /// Baseline origin for a `w`×`h` text box.
    pub fn resolve_text(&self, canvas_w: f32, canvas_h: f32, w: f32, h: f32) -> (f32, f32) {
        match *self {
            Position::Named(p) => text_position(p, canvas_w, canvas_h, w, h),
            Position::At(x, y) => (x as f32, y as f32),
        }
    }
}

/// Mark table: `(x, y)` is the top-left corner of the scaled mark.
pub fn mark_position(pos: NamedPosition, canvas_w: f32, canvas_h: f32, w: f32, h: f32) -> (f32, f32) {
    let left = SIDE_MARGIN;
    let center_x = canvas_w / 2.0 - w / 2.0;
    let right = canvas_w - w - SIDE_MARGIN;
    let top = TOP_MARGIN;
    let middle = canvas_h / 2.0 - h / 2.0;
    let bottom = canvas_h - h - SIDE_MARGIN;

    match pos {
        NamedPosition::TopLeft      => (left, top),
        NamedPosition::TopCenter    => (center_x, top),
        NamedPosition::TopRight     => (right, top),
        NamedPosition::MiddleLeft   => (left, middle),
        NamedPosition::Center       => (center_x, middle),
        NamedPosition::MiddleRight  => (right, middle),
        NamedPosition::BottomLeft   => (left, bottom),
        NamedPosition::BottomCenter => (center_x, bottom),
        NamedPosition::BottomRight  => (right, bottom),
    }
}

/// Text table: same as [`mark_position`] except the middle row, where
/// `y = H/2 + h/2` because text is drawn up from its baseline.
pub fn text_position(pos: NamedPosition, canvas_w: f32, canvas_h: f32, w: f32, h: f32) -> (f32, f32) {
    let (x, y) = mark_position(pos, canvas_w, canvas_h, w, h);
    if pos.is_middle_row() {
        (x, canvas_h / 2.0 + h / 2.0)
    } else {
        (x, y)
    }
}

/// Target mark size: width is `base_width * scale`, height follows the
/// watermark's own aspect ratio.
pub fn scaled_mark_size(base_width: u32, mark_w: u32, mark_h: u32, scale: f32) -> (f32, f32) {
    let target_w = base_width as f32 * scale;
    let target_h = (mark_h as f32 / mark_w as f32) * target_w;
    (target_w, target_h)
}
