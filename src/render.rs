use crate::console::{Action, Console};
use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::{
    Color, IntRect, Paint, Pixmap, PixmapPaint, PremultipliedColorU8, Rect, Transform,
};

const BACKGROUND: [u8; 3] = [0x0D, 0x02, 0x08];
const TEXT: [u8; 3] = [0x00, 0xFF, 0x41];
const PANEL: [u8; 3] = [0x20, 0x27, 0x29];
const TEXT_INPUT: [u8; 3] = [0x00, 0x8F, 0x11];
const BUTTON: [u8; 3] = [0x00, 0xFF, 0x41];
const BUTTON_ENGAGED: [u8; 3] = [0xFF, 0xB0, 0x00];
const ERROR: [u8; 3] = [0xFF, 0x55, 0x55];

const MARGIN: f32 = 12.0;
const GAP: f32 = 8.0;
const ROW_HEIGHT: f32 = 44.0;
const COLUMNS: usize = 5;
const LABEL_PX: f32 = 18.0;
const LOG_PX: f32 = 15.0;
const LINE_HEIGHT: f32 = 19.0;

const FIRST_ROW: [Action; COLUMNS] = [
    Action::Trigger,
    Action::Beep,
    Action::AutoBeep,
    Action::Recording,
    Action::P300,
];
const SECOND_ROW: [Action; 3] = [Action::Dribble, Action::Shot, Action::Release];

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn rgb(c: [u8; 3]) -> Color {
    Color::from_rgba8(c[0], c[1], c[2], 255)
}

/// Loads the configured font, falling back to common system locations.
/// Without a font the panel still works, just without captions.
pub fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    let candidates = configured
        .into_iter()
        .map(Path::to_path_buf)
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                log::info!("Using font {}", path.display());
                return Some(font);
            }
            Err(e) => log::warn!("Ignoring font {}: {e}", path.display()),
        }
    }
    log::warn!("No usable font found, buttons will have no captions");
    None
}

/// Rasterized text and where its top-left sits relative to the line's top-left.
pub struct TextPixmap {
    pub pixmap: Pixmap,
    pub offset: (f32, f32),
}

pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<TextPixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // Layout with the baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    if outlines.is_empty() {
        return None;
    }
    min_x = min_x.floor();
    min_y = min_y.floor();

    let w = (max_x.ceil() - min_x).max(1.0) as u32;
    let h = (max_y.ceil() - min_y).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;

    let stride = w as usize;
    let dst = pm.pixels_mut();
    let cu = color.to_color_u8();

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x) as i32;
            let iy = (y as f32 + b.min.y - min_y) as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // Source premultiplied by coverage, then Porter-Duff over
            let a = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let src = [
                cu.red() as f32 * a,
                cu.green() as f32 * a,
                cu.blue() as f32 * a,
                a * 255.0,
            ];
            let bg = dst[i];
            let inv = 1.0 - a;
            let blend = |s: f32, d: u8| (s + d as f32 * inv).min(255.0) as u8;
            let alpha = blend(src[3], bg.alpha());
            let channel = |s: f32, d: u8| blend(s, d).min(alpha);
            if let Some(px) = PremultipliedColorU8::from_rgba(
                channel(src[0], bg.red()),
                channel(src[1], bg.green()),
                channel(src[2], bg.blue()),
                alpha,
            ) {
                dst[i] = px;
            }
        });
    }

    Some(TextPixmap {
        pixmap: pm,
        offset: (min_x, min_y),
    })
}

#[derive(Clone, Copy)]
struct Button {
    action: Action,
    rect: Rect,
}

struct Layout {
    buttons: Vec<Button>,
    count: Rect,
    input: Rect,
    log: Rect,
    status: Rect,
}

impl Layout {
    fn compute(width: u32, height: u32) -> Option<Self> {
        let w = width as f32;
        let h = height as f32;
        let cell = ((w - 2.0 * MARGIN - (COLUMNS as f32 - 1.0) * GAP) / COLUMNS as f32).max(1.0);
        let column_x = |col: usize| MARGIN + col as f32 * (cell + GAP);
        let row_y = |row: usize| MARGIN + row as f32 * (ROW_HEIGHT + GAP);
        let at = |col: usize, row: usize| Rect::from_xywh(column_x(col), row_y(row), cell, ROW_HEIGHT);

        let mut buttons = Vec::with_capacity(FIRST_ROW.len() + SECOND_ROW.len() + 1);
        for (col, action) in FIRST_ROW.into_iter().enumerate() {
            buttons.push(Button { action, rect: at(col, 0)? });
        }
        for (col, action) in SECOND_ROW.into_iter().enumerate() {
            buttons.push(Button { action, rect: at(col, 1)? });
        }
        buttons.push(Button {
            action: Action::Send,
            rect: at(0, 2)?,
        });

        let count = at(SECOND_ROW.len(), 1)?;
        let input = Rect::from_xywh(
            column_x(1),
            row_y(2),
            (w - MARGIN - column_x(1)).max(1.0),
            ROW_HEIGHT,
        )?;
        let status_top = h - MARGIN - LINE_HEIGHT;
        let log_top = row_y(3);
        let log = Rect::from_xywh(
            MARGIN,
            log_top,
            (w - 2.0 * MARGIN).max(1.0),
            (status_top - GAP - log_top).max(1.0),
        )?;
        let status = Rect::from_xywh(MARGIN, status_top, (w - 2.0 * MARGIN).max(1.0), LINE_HEIGHT)?;

        Some(Self {
            buttons,
            count,
            input,
            log,
            status,
        })
    }
}

/// Draws the operator panel into a tiny-skia canvas and copies it into the
/// pixel buffer.
pub struct PanelRenderer {
    width: u32,
    height: u32,
    font: Option<FontVec>,
    labels: HashMap<&'static str, Arc<TextPixmap>>,
    layout: Layout,
    canvas: Pixmap,
}

impl PanelRenderer {
    pub fn new(width: u32, height: u32, font: Option<FontVec>) -> Result<Self> {
        let (layout, canvas) = Self::surfaces(width, height)?;
        Ok(Self {
            width,
            height,
            font,
            labels: HashMap::new(),
            layout,
            canvas,
        })
    }

    fn surfaces(width: u32, height: u32) -> Result<(Layout, Pixmap)> {
        let layout = Layout::compute(width, height)
            .ok_or_else(|| anyhow!("panel does not fit in {width}x{height}"))?;
        let canvas =
            Pixmap::new(width, height).ok_or_else(|| anyhow!("invalid canvas {width}x{height}"))?;
        Ok((layout, canvas))
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let (layout, canvas) = Self::surfaces(width, height)?;
        self.width = width;
        self.height = height;
        self.layout = layout;
        self.canvas = canvas;
        Ok(())
    }

    /// The button under a point in physical pixels.
    pub fn action_at(&self, x: f32, y: f32) -> Option<Action> {
        self.layout
            .buttons
            .iter()
            .find(|b| {
                x >= b.rect.left() && x < b.rect.right() && y >= b.rect.top() && y < b.rect.bottom()
            })
            .map(|b| b.action)
    }

    pub fn render(&mut self, console: &Console, frame: &mut [u8]) -> Result<()> {
        self.canvas.fill(rgb(BACKGROUND));

        for i in 0..self.layout.buttons.len() {
            let Button { action, rect } = self.layout.buttons[i];
            let fill = if console.is_engaged(action) {
                BUTTON_ENGAGED
            } else {
                BUTTON
            };
            self.fill(rect, fill);
            if let Some(label) = self.label(console.label(action)) {
                let (w, h) = (label.pixmap.width() as f32, label.pixmap.height() as f32);
                let x = rect.left() + (rect.width() - w) / 2.0;
                let y = rect.top() + (rect.height() - h) / 2.0;
                self.blit(&label.pixmap, x, y);
            }
        }

        let count = self.layout.count;
        let count_text = format!("COUNT: {}", console.shot_count());
        self.text(&count_text, LABEL_PX, TEXT, count.left(), count.top() + 12.0, count.width());

        let input = self.layout.input;
        self.fill(input, PANEL);
        let typed = format!("{}_", console.input());
        self.text(&typed, LABEL_PX, TEXT_INPUT, input.left() + 8.0, input.top() + 12.0, input.width() - 16.0);

        let log = self.layout.log;
        self.fill(log, PANEL);
        let visible = ((log.height() - 8.0) / LINE_HEIGHT).max(0.0) as usize;
        let lines: Vec<&str> = console.log_lines().rev().take(visible).collect();
        for (row, line) in lines.into_iter().rev().enumerate() {
            let y = log.top() + 4.0 + row as f32 * LINE_HEIGHT;
            self.text(line, LOG_PX, TEXT, log.left() + 6.0, y, log.width() - 12.0);
        }

        if let Some(status) = console.status() {
            let bar = self.layout.status;
            self.text(status, LOG_PX, ERROR, bar.left(), bar.top(), bar.width());
        }

        let data = self.canvas.data();
        if frame.len() != data.len() {
            return Err(anyhow!(
                "frame holds {} bytes, canvas {}x{} needs {}",
                frame.len(),
                self.width,
                self.height,
                data.len()
            ));
        }
        frame.copy_from_slice(data);
        Ok(())
    }

    fn fill(&mut self, rect: Rect, color: [u8; 3]) {
        let mut paint = Paint::default();
        paint.set_color(rgb(color));
        self.canvas.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn label(&mut self, text: &'static str) -> Option<Arc<TextPixmap>> {
        if let Some(cached) = self.labels.get(text) {
            return Some(Arc::clone(cached));
        }
        let font = self.font.as_ref()?;
        let rendered = Arc::new(render_text_pixmap(text, LABEL_PX, font, rgb(BACKGROUND))?);
        self.labels.insert(text, Arc::clone(&rendered));
        Some(rendered)
    }

    fn text(&mut self, text: &str, size: f32, color: [u8; 3], x: f32, y: f32, max_width: f32) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let Some(rendered) = render_text_pixmap(text, size, font, rgb(color)) else {
            return;
        };
        let limit = max_width.max(1.0) as u32;
        let pixmap = if rendered.pixmap.width() > limit {
            IntRect::from_xywh(0, 0, limit, rendered.pixmap.height())
                .and_then(|r| rendered.pixmap.clone_rect(r))
        } else {
            Some(rendered.pixmap)
        };
        if let Some(pixmap) = pixmap {
            self.blit(&pixmap, x + rendered.offset.0, y + rendered.offset.1);
        }
    }

    fn blit(&mut self, pixmap: &Pixmap, x: f32, y: f32) {
        self.canvas.draw_pixmap(
            x.round() as i32,
            y.round() as i32,
            pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}
