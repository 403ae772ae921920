use super::ManifestError;
use std::path::{Path, PathBuf};

/// Rewrites a manifest file one entry at a time
pub struct ManifestEditor {
    path: PathBuf,
}

impl ManifestEditor {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Remove `name` from the `section` block. Returns false if it was not there.
    pub fn remove(&self, section: &str, name: &str) -> Result<bool, ManifestError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| ManifestError::Read {
            path: self.path.clone(),
            source,
        })?;

        let Some(new_contents) = remove_entry(&contents, section, name) else {
            return Ok(false);
        };

        std::fs::write(&self.path, new_contents).map_err(|source| ManifestError::Write {
            path: self.path.clone(),
            source,
        })?;

        Ok(true)
    }
}

/// Splice one `"name": value` entry out of a top-level object block.
///
/// Every byte outside the removed entry is kept, so key order, indentation
/// and line endings survive. Returns `None` when the block or entry is absent
/// or the text is not the expected JSON shape.
pub fn remove_entry(contents: &str, section: &str, name: &str) -> Option<String> {
    let mut cursor = Cursor::new(contents);
    cursor.skip_ws();
    let root = cursor.object()?;

    let block = root.entries.iter().find(|e| e.key == section)?;
    let mut inner = Cursor::at(contents, block.value_start);
    let block = inner.object()?;

    let index = block.entries.iter().position(|e| e.key == name)?;
    let entries = &block.entries;

    let (start, end) = if entries.len() == 1 {
        // `{ "a": "1" }` collapses to `{}`
        (block.open + 1, block.close)
    } else if index + 1 < entries.len() {
        (entries[index].key_start, entries[index + 1].key_start)
    } else {
        (entries[index - 1].value_end, entries[index].value_end)
    };

    Some(format!("{}{}", &contents[..start], &contents[end..]))
}

struct Entry {
    key: String,
    key_start: usize,
    value_start: usize,
    value_end: usize,
}

struct Object {
    open: usize,
    close: usize,
    entries: Vec<Entry>,
}

/// Minimal JSON walker that records byte offsets
struct Cursor<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self::at(text, 0)
    }

    fn at(text: &'a str, pos: usize) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> Option<()> {
        self.skip_ws();
        if self.peek()? == byte {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    /// Consume a string literal, returning its span including quotes
    fn string(&mut self) -> Option<(usize, usize)> {
        self.skip_ws();
        if self.peek()? != b'"' {
            return None;
        }
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek()? {
                b'\\' => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    return Some((start, self.pos));
                }
                _ => self.pos += 1,
            }
        }
    }

    fn object(&mut self) -> Option<Object> {
        self.skip_ws();
        let open = self.pos;
        self.eat(b'{')?;

        let mut entries = Vec::new();
        self.skip_ws();
        if self.peek()? == b'}' {
            self.pos += 1;
            return Some(Object {
                open,
                close: self.pos - 1,
                entries,
            });
        }

        loop {
            let (key_start, key_end) = self.string()?;
            let key: String = serde_json::from_str(&self.text[key_start..key_end]).ok()?;
            self.eat(b':')?;
            self.skip_ws();
            let value_start = self.pos;
            self.value()?;
            entries.push(Entry {
                key,
                key_start,
                value_start,
                value_end: self.pos,
            });

            self.skip_ws();
            match self.peek()? {
                b',' => self.pos += 1,
                b'}' => {
                    self.pos += 1;
                    return Some(Object {
                        open,
                        close: self.pos - 1,
                        entries,
                    });
                }
                _ => return None,
            }
        }
    }

    /// Skip over any value
    fn value(&mut self) -> Option<()> {
        self.skip_ws();
        match self.peek()? {
            b'"' => self.string().map(|_| ()),
            b'{' | b'[' => {
                let mut depth = 0usize;
                loop {
                    match self.peek()? {
                        b'"' => {
                            self.string()?;
                            continue;
                        }
                        b'{' | b'[' => depth += 1,
                        b'}' | b']' => {
                            depth -= 1;
                            if depth == 0 {
                                self.pos += 1;
                                return Some(());
                            }
                        }
                        _ => {}
                    }
                    self.pos += 1;
                }
            }
            _ => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if matches!(b, b',' | b'}' | b']' | b' ' | b'\t' | b'\r' | b'\n') {
                        break;
                    }
                    self.pos += 1;
                }
                (self.pos > start).then_some(())
            }
        }
    }
}
