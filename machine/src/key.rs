use serde::{Deserialize, Serialize};

/// Number of rows and columns of the keyboard matrix.
pub const MATRIX_SIZE: usize = 8;

/// A key of the C64 keyboard.
///
/// Matrix keys map to a (row, column) pair as scanned through CIA1:
///
/// | Row | Col0 | Col1 | Col2 | Col3 | Col4 | Col5 | Col6 | Col7 |
/// |-----|------|------|------|------|------|------|------|------|
/// | 0   | DEL  | 3    | 5    | 7    | 9    | +    | £    | 1    |
/// | 1   | RET  | W    | R    | Y    | I    | P    | *    | ←    |
/// | 2   | →    | A    | D    | G    | J    | L    | ;    | CTRL |
/// | 3   | F7   | 4    | 6    | 8    | 0    | -    | HOME | 2    |
/// | 4   | F1   | Z    | C    | B    | M    | .    | RSHFT| SPC  |
/// | 5   | F3   | S    | F    | H    | K    | :    | =    | C=   |
/// | 6   | F5   | E    | T    | U    | O    | @    | ↑    | Q    |
/// | 7   | ↓    | LSHFT| X    | V    | N    | ,    | /    | STOP |
///
/// `Restore` is wired straight to the NMI line and `ShiftLock` is a
/// mechanical latch over left shift; neither has a matrix position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    // Row 0
    Delete,
    N3,
    N5,
    N7,
    N9,
    Plus,
    Pound,
    N1,
    // Row 1
    Return,
    W,
    R,
    Y,
    I,
    P,
    Asterisk,
    ArrowLeft,
    // Row 2
    CursorLeftRight,
    A,
    D,
    G,
    J,
    L,
    Semicolon,
    Control,
    // Row 3
    F7,
    N4,
    N6,
    N8,
    N0,
    Minus,
    ClearHome,
    N2,
    // Row 4
    F1,
    Z,
    C,
    B,
    M,
    Period,
    ShiftRight,
    Space,
    // Row 5
    F3,
    S,
    F,
    H,
    K,
    Colon,
    Equals,
    Commodore,
    // Row 6
    F5,
    E,
    T,
    U,
    O,
    At,
    ArrowUp,
    Q,
    // Row 7
    CursorUpDown,
    ShiftLeft,
    X,
    V,
    N,
    Comma,
    Slash,
    RunStop,

    Restore,
    ShiftLock,
}

impl Key {
    /// (row, column) of the key in the keyboard matrix.
    #[must_use]
    pub const fn matrix(self) -> Option<(u8, u8)> {
        let position = match self {
            Self::Delete => (0, 0),
            Self::N3 => (0, 1),
            Self::N5 => (0, 2),
            Self::N7 => (0, 3),
            Self::N9 => (0, 4),
            Self::Plus => (0, 5),
            Self::Pound => (0, 6),
            Self::N1 => (0, 7),

            Self::Return => (1, 0),
            Self::W => (1, 1),
            Self::R => (1, 2),
            Self::Y => (1, 3),
            Self::I => (1, 4),
            Self::P => (1, 5),
            Self::Asterisk => (1, 6),
            Self::ArrowLeft => (1, 7),

            Self::CursorLeftRight => (2, 0),
            Self::A => (2, 1),
            Self::D => (2, 2),
            Self::G => (2, 3),
            Self::J => (2, 4),
            Self::L => (2, 5),
            Self::Semicolon => (2, 6),
            Self::Control => (2, 7),

            Self::F7 => (3, 0),
            Self::N4 => (3, 1),
            Self::N6 => (3, 2),
            Self::N8 => (3, 3),
            Self::N0 => (3, 4),
            Self::Minus => (3, 5),
            Self::ClearHome => (3, 6),
            Self::N2 => (3, 7),

            Self::F1 => (4, 0),
            Self::Z => (4, 1),
            Self::C => (4, 2),
            Self::B => (4, 3),
            Self::M => (4, 4),
            Self::Period => (4, 5),
            Self::ShiftRight => (4, 6),
            Self::Space => (4, 7),

            Self::F3 => (5, 0),
            Self::S => (5, 1),
            Self::F => (5, 2),
            Self::H => (5, 3),
            Self::K => (5, 4),
            Self::Colon => (5, 5),
            Self::Equals => (5, 6),
            Self::Commodore => (5, 7),

            Self::F5 => (6, 0),
            Self::E => (6, 1),
            Self::T => (6, 2),
            Self::U => (6, 3),
            Self::O => (6, 4),
            Self::At => (6, 5),
            Self::ArrowUp => (6, 6),
            Self::Q => (6, 7),

            Self::CursorUpDown => (7, 0),
            Self::ShiftLeft => (7, 1),
            Self::X => (7, 2),
            Self::V => (7, 3),
            Self::N => (7, 4),
            Self::Comma => (7, 5),
            Self::Slash => (7, 6),
            Self::RunStop => (7, 7),

            Self::Restore | Self::ShiftLock => return None,
        };
        Some(position)
    }

    /// Keys to hold down to type `ch`.
    ///
    /// Letters are typed unshifted (the C64 boots in upper case mode).
    /// Characters without a key combination yield an empty slice.
    #[must_use]
    pub const fn for_char(ch: char) -> &'static [Self] {
        match ch {
            'a' | 'A' => &[Self::A],
            'b' | 'B' => &[Self::B],
            'c' | 'C' => &[Self::C],
            'd' | 'D' => &[Self::D],
            'e' | 'E' => &[Self::E],
            'f' | 'F' => &[Self::F],
            'g' | 'G' => &[Self::G],
            'h' | 'H' => &[Self::H],
            'i' | 'I' => &[Self::I],
            'j' | 'J' => &[Self::J],
            'k' | 'K' => &[Self::K],
            'l' | 'L' => &[Self::L],
            'm' | 'M' => &[Self::M],
            'n' | 'N' => &[Self::N],
            'o' | 'O' => &[Self::O],
            'p' | 'P' => &[Self::P],
            'q' | 'Q' => &[Self::Q],
            'r' | 'R' => &[Self::R],
            's' | 'S' => &[Self::S],
            't' | 'T' => &[Self::T],
            'u' | 'U' => &[Self::U],
            'v' | 'V' => &[Self::V],
            'w' | 'W' => &[Self::W],
            'x' | 'X' => &[Self::X],
            'y' | 'Y' => &[Self::Y],
            'z' | 'Z' => &[Self::Z],
            '0' => &[Self::N0],
            '1' => &[Self::N1],
            '2' => &[Self::N2],
            '3' => &[Self::N3],
            '4' => &[Self::N4],
            '5' => &[Self::N5],
            '6' => &[Self::N6],
            '7' => &[Self::N7],
            '8' => &[Self::N8],
            '9' => &[Self::N9],
            ' ' => &[Self::Space],
            '\n' => &[Self::Return],
            '.' => &[Self::Period],
            ',' => &[Self::Comma],
            ':' => &[Self::Colon],
            ';' => &[Self::Semicolon],
            '=' => &[Self::Equals],
            '/' => &[Self::Slash],
            '+' => &[Self::Plus],
            '-' => &[Self::Minus],
            '*' => &[Self::Asterisk],
            '@' => &[Self::At],
            '£' => &[Self::Pound],
            '^' => &[Self::ArrowUp],
            '!' => &[Self::ShiftLeft, Self::N1],
            '"' => &[Self::ShiftLeft, Self::N2],
            '#' => &[Self::ShiftLeft, Self::N3],
            '$' => &[Self::ShiftLeft, Self::N4],
            '%' => &[Self::ShiftLeft, Self::N5],
            '&' => &[Self::ShiftLeft, Self::N6],
            '\'' => &[Self::ShiftLeft, Self::N7],
            '(' => &[Self::ShiftLeft, Self::N8],
            ')' => &[Self::ShiftLeft, Self::N9],
            '[' => &[Self::ShiftLeft, Self::Colon],
            ']' => &[Self::ShiftLeft, Self::Semicolon],
            '<' => &[Self::ShiftLeft, Self::Comma],
            '>' => &[Self::ShiftLeft, Self::Period],
            '?' => &[Self::ShiftLeft, Self::Slash],
            _ => &[],
        }
    }
}
