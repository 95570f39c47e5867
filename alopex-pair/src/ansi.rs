/*!
 * ANSI escape stripping for logged tool output
 */

const ESC: char = '\x1b';

/// Drop escape sequences and the readline `\x01`/`\x02` markers bluetoothctl
/// wraps around its colored prompt.
pub fn strip(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ESC => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // Parameter and intermediate bytes run up to a final byte in '@'..='~'
                    for next in chars.by_ref() {
                        if ('@'..='~').contains(&next) {
                            break;
                        }
                    }
                }
                Some(next) if ('@'..='_').contains(next) => {
                    chars.next();
                }
                _ => {}
            },
            '\x01' | '\x02' => {}
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_colored_prompt() {
        let raw = "\x01\x1b[0;94m\x02[bluetooth]\x01\x1b[0m\x02# ";
        assert_eq!(strip(raw), "[bluetooth]# ");
    }

    #[test]
    fn strips_line_clearing_sequences() {
        let raw = "\r\x1b[K[\x1b[0;92mNEW\x1b[0m] Device AA:BB:CC:DD:EE:FF Speaker";
        assert_eq!(strip(raw), "\r[NEW] Device AA:BB:CC:DD:EE:FF Speaker");
    }

    #[test]
    fn keeps_plain_text_and_lone_escape() {
        assert_eq!(strip("Pairing successful"), "Pairing successful");
        assert_eq!(strip("end\x1b"), "end");
        assert_eq!(strip("\x1bMup"), "up");
    }
}
