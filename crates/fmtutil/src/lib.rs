//! Small `Display` helpers for printing slices without allocating an intermediate `String` at
//! every call site.

use std::fmt;

/// A `Display` wrapper around a slice, printed as `[a, b, c]`.
pub struct DisplayableSlice<'a, T> {
    items: &'a [T],
    open: &'static str,
    close: &'static str,
}

impl<'a, T: fmt::Display> fmt::Display for DisplayableSlice<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.open)?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, "{}", self.close)
    }
}

pub trait IntoDisplayableSlice<T> {
    fn display_with_brackets(&self) -> DisplayableSlice<'_, T>;
    fn display_with_parens(&self) -> DisplayableSlice<'_, T>;
}

impl<T: fmt::Display> IntoDisplayableSlice<T> for [T] {
    fn display_with_brackets(&self) -> DisplayableSlice<'_, T> {
        DisplayableSlice {
            items: self,
            open: "[",
            close: "]",
        }
    }

    fn display_with_parens(&self) -> DisplayableSlice<'_, T> {
        DisplayableSlice {
            items: self,
            open: "(",
            close: ")",
        }
    }
}

impl<T: fmt::Display> IntoDisplayableSlice<T> for Vec<T> {
    fn display_with_brackets(&self) -> DisplayableSlice<'_, T> {
        self.as_slice().display_with_brackets()
    }

    fn display_with_parens(&self) -> DisplayableSlice<'_, T> {
        self.as_slice().display_with_parens()
    }
}
