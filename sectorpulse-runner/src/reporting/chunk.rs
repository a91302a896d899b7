//! Splitting rendered text into blocks the notification channel accepts.

/// Hard per-message ceiling of the delivery channel, in characters.
pub const MESSAGE_LIMIT: usize = 4096;

/// Split every block longer than `limit` characters on line boundaries,
/// hard-splitting single lines that are themselves too long.
///
/// Whitespace-only blocks are dropped; no output block is empty or longer
/// than `limit`. Blocks already within the limit pass through unchanged.
pub fn chunk_blocks<S: AsRef<str>>(blocks: &[S], limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut out = Vec::with_capacity(blocks.len());

    for block in blocks {
        let block = block.as_ref();
        if block.trim().is_empty() {
            continue;
        }
        if block.chars().count() <= limit {
            out.push(block.to_string());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0usize;
        for line in block.split('\n') {
            let line_len = line.chars().count();

            if line_len > limit {
                flush(&mut out, &mut current, &mut current_len);
                let chars: Vec<char> = line.chars().collect();
                for piece in chars.chunks(limit) {
                    let piece: String = piece.iter().collect();
                    if !piece.trim().is_empty() {
                        out.push(piece);
                    }
                }
                continue;
            }

            // Joining newline counts toward the limit.
            let needed = if current.is_empty() { line_len } else { current_len + 1 + line_len };
            if needed > limit {
                flush(&mut out, &mut current, &mut current_len);
            }
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(line);
            current_len += line_len;
        }
        flush(&mut out, &mut current, &mut current_len);
    }

    out
}

fn flush(out: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    if !current.trim().is_empty() {
        out.push(std::mem::take(current));
    }
    current.clear();
    *current_len = 0;
}
