use std::collections::HashMap;

use once_cell::sync::Lazy;

pub const FONT_HEIGHT: usize = 5;
const FILL_CHAR: char = '█';
const SPACING: usize = 1;

type Glyph = [&'static str; FONT_HEIGHT];

const BLANK: Glyph = ["   ", "   ", "   ", "   ", "   "];

static GLYPHS: Lazy<HashMap<char, Glyph>> = Lazy::new(|| {
    HashMap::from([
        ('0', ["111", "1 1", "1 1", "1 1", "111"]),
        ('1', [" 1 ", "11 ", " 1 ", " 1 ", "111"]),
        ('2', ["111", "  1", "111", "1  ", "111"]),
        ('3', ["111", "  1", " 11", "  1", "111"]),
        ('4', ["1 1", "1 1", "111", "  1", "  1"]),
        ('5', ["111", "1  ", "111", "  1", "111"]),
        ('6', ["111", "1  ", "111", "1 1", "111"]),
        ('7', ["111", "  1", " 1 ", " 1 ", " 1 "]),
        ('8', ["111", "1 1", "111", "1 1", "111"]),
        ('9', ["111", "1 1", "111", "  1", "111"]),
        (':', [" ", "1", " ", "1", " "]),
        ('.', [" ", " ", " ", " ", "1"]),
        ('-', ["   ", "   ", "111", "   ", "   "]),
        ('$', [" 11", "11 ", " 1 ", " 11", "11 "]),
        (' ', BLANK),
    ])
});

/// Render `text` as `FONT_HEIGHT` rows of block characters. Characters
/// outside the font render as blanks.
pub fn render(text: &str) -> Vec<String> {
    let mut rows = vec![String::new(); FONT_HEIGHT];
    for (index, ch) in text.chars().enumerate() {
        let glyph = GLYPHS.get(&ch).unwrap_or(&BLANK);
        for (row, pattern) in rows.iter_mut().zip(glyph.iter()) {
            if index > 0 {
                row.extend(std::iter::repeat(' ').take(SPACING));
            }
            row.extend(
                pattern
                    .chars()
                    .map(|symbol| if symbol == '1' { FILL_CHAR } else { ' ' }),
            );
        }
    }
    rows.into_iter()
        .map(|row| row.trim_end().to_string())
        .collect()
}

/// Width in cells of the widest row `render` would produce.
pub fn width(text: &str) -> usize {
    render(text)
        .iter()
        .map(|row| row.chars().count())
        .max()
        .unwrap_or(0)
}
