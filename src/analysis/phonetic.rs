use crate::core::config::PhoneticAlgorithm;

impl PhoneticAlgorithm {
    pub fn encode(self, word: &str) -> String {
        match self {
            PhoneticAlgorithm::Soundex => soundex(word),
            PhoneticAlgorithm::Metaphone => metaphone(word),
        }
    }
}

fn soundex_digit(ch: char) -> Option<char> {
    match ch {
        'B' | 'F' | 'P' | 'V' => Some('1'),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some('2'),
        'D' | 'T' => Some('3'),
        'L' => Some('4'),
        'M' | 'N' => Some('5'),
        'R' => Some('6'),
        _ => None,
    }
}

/// American Soundex. Non-ASCII letters are ignored; an input with no ASCII
/// letters encodes to the empty string.
pub fn soundex(word: &str) -> String {
    let chars: Vec<char> = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let Some(&first) = chars.first() else {
        return String::new();
    };

    let mut code = String::with_capacity(4);
    code.push(first);
    let mut prev = soundex_digit(first);

    for &ch in &chars[1..] {
        if code.len() == 4 {
            break;
        }
        match soundex_digit(ch) {
            Some(digit) => {
                if Some(digit) != prev {
                    code.push(digit);
                }
                prev = Some(digit);
            }
            // H and W do not separate letters with the same code
            None if ch == 'H' || ch == 'W' => {}
            None => prev = None,
        }
    }

    while code.len() < 4 {
        code.push('0');
    }
    code
}

fn is_vowel(ch: Option<&char>) -> bool {
    matches!(ch, Some('A' | 'E' | 'I' | 'O' | 'U'))
}

const METAPHONE_MAX_LEN: usize = 6;

/// Simplified Metaphone covering the common English consonant rules
pub fn metaphone(word: &str) -> String {
    let mut w: Vec<char> = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if w.is_empty() {
        return String::new();
    }

    let mut start = 0;
    let head = (w.first().copied(), w.get(1).copied());
    match head {
        (Some('K' | 'G' | 'P'), Some('N')) | (Some('A'), Some('E')) | (Some('W'), Some('R')) => {
            start = 1
        }
        (Some('X'), _) => w[0] = 'S',
        (Some('W'), Some('H')) => {
            w.remove(1);
        }
        _ => {}
    }

    let mut code = String::new();
    for i in start..w.len() {
        if code.len() >= METAPHONE_MAX_LEN {
            break;
        }
        let c = w[i];
        let prev = if i > 0 { w.get(i - 1) } else { None };
        let next = w.get(i + 1);
        let after = w.get(i + 2);

        if prev == Some(&c) && c != 'C' {
            continue;
        }

        match c {
            'A' | 'E' | 'I' | 'O' | 'U' => {
                if i == start {
                    code.push(c);
                }
            }
            'B' => {
                if !(prev == Some(&'M') && i == w.len() - 1) {
                    code.push('B');
                }
            }
            'C' => match next {
                Some('I') if after == Some(&'A') => code.push('X'),
                Some('I' | 'E' | 'Y') => code.push('S'),
                Some('H') => code.push('X'),
                _ => code.push('K'),
            },
            'D' => {
                if next == Some(&'G') && matches!(after, Some('E' | 'I' | 'Y')) {
                    code.push('J');
                } else {
                    code.push('T');
                }
            }
            'G' => match next {
                Some('H') if i != start => {}
                Some('N') if i + 2 >= w.len() => {}
                Some('E' | 'I' | 'Y') => code.push('J'),
                _ => code.push('K'),
            },
            'H' => {
                let silent_after = matches!(prev, Some('C' | 'G' | 'P' | 'S' | 'T'));
                if is_vowel(next) && !silent_after {
                    code.push('H');
                }
            }
            'K' => {
                if prev != Some(&'C') {
                    code.push('K');
                }
            }
            'P' => code.push(if next == Some(&'H') { 'F' } else { 'P' }),
            'Q' => code.push('K'),
            'S' => match next {
                Some('H') => code.push('X'),
                Some('I') if matches!(after, Some('O' | 'A')) => code.push('X'),
                _ => code.push('S'),
            },
            'T' => match next {
                Some('H') => code.push('0'),
                Some('I') if matches!(after, Some('O' | 'A')) => code.push('X'),
                _ => code.push('T'),
            },
            'V' => code.push('F'),
            'W' | 'Y' => {
                if is_vowel(next) {
                    code.push(c);
                }
            }
            'X' => code.push_str("KS"),
            'Z' => code.push('S'),
            other => code.push(other),
        }
    }

    code.truncate(METAPHONE_MAX_LEN);
    code
}
