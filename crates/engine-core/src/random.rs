use model::documents::{Point, Polygon};
use rand::{
    Rng, RngCore, SeedableRng,
    rngs::{OsRng, SmallRng},
};

/// Vocabulary for the `words` attribute.
pub const WORD_LIST: [&str; 17] = [
    "Aldi Süd",
    "Aldi Nord",
    "Lidl",
    "Edeka",
    "Tengelmann",
    "Grosso",
    "allkauf",
    "neukauf",
    "Rewe",
    "Holdrio",
    "real",
    "Globus",
    "Norma",
    "Del Haize",
    "Spar",
    "Tesco",
    "Morrison",
];

/// Per worker random source for payloads, words and geometry.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: SmallRng,
}

/// Fresh seed for a run; workers derive their own from it.
pub fn base_seed() -> u64 {
    OsRng.next_u64()
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// `length` printable bytes, each in `33..=122`.
    pub fn string(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| char::from(33 + (self.rng.next_u32() % 90) as u8))
            .collect()
    }

    /// ASCII letters broken into words of 3 to 19 characters by single spaces.
    pub fn string_with_spaces(&mut self, length: usize) -> String {
        let mut out = String::with_capacity(length);
        let mut word_len = self.word_length();
        for _ in 0..length {
            word_len -= 1;
            if word_len == 0 {
                word_len = self.word_length();
                out.push(' ');
            } else {
                let mut c = 65 + (self.rng.next_u32() % 52) as u8;
                if c >= 91 {
                    c += 6;
                }
                out.push(char::from(c));
            }
        }
        out
    }

    fn word_length(&mut self) -> u32 {
        self.rng.next_u32() % 17 + 3
    }

    /// `n` words drawn with replacement from [`WORD_LIST`].
    pub fn words(&mut self, n: usize) -> String {
        let mut words = Vec::with_capacity(n);
        for _ in 0..n {
            words.push(WORD_LIST[self.rng.gen_range(0..WORD_LIST.len())]);
        }
        words.join(" ")
    }

    /// Four points with longitude in `[-90, 210)` and latitude in `[-80, 80)`.
    pub fn polygon(&mut self) -> Polygon {
        let coordinates: Vec<Point> = (0..4)
            .map(|_| {
                [
                    self.rng.gen_range(0.0..1.0) * 300.0 - 90.0,
                    self.rng.gen_range(0.0..1.0) * 160.0 - 80.0,
                ]
            })
            .collect();
        Polygon::new(coordinates)
    }

    /// Uniform integer in `0..bound`; `bound` must be positive.
    pub fn below(&mut self, bound: u64) -> u64 {
        self.rng.gen_range(0..bound)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_string_is_printable_and_exact() {
        let mut random = RandomSource::new(7);
        for len in [0, 1, 16, 1400] {
            let s = random.string(len);
            assert_eq!(s.len(), len);
            assert!(s.bytes().all(|b| (33..=122).contains(&b)));
        }
    }

    #[test]
    fn spaced_string_has_bounded_words() {
        let mut random = RandomSource::new(11);
        let s = random.string_with_spaces(5000);

        assert_eq!(s.len(), 5000);
        assert!(s.bytes().all(|b| b == b' ' || b.is_ascii_alphabetic()));
        for word in s.split(' ').filter(|w| !w.is_empty()) {
            assert!(word.len() <= 18, "word too long: {}", word.len());
        }
    }

    #[test]
    fn words_come_from_vocabulary() {
        let mut random = RandomSource::new(3);
        let words = random.words(5);
        let mut rest = words.as_str();
        let mut count = 0;
        while !rest.is_empty() {
            let word = WORD_LIST
                .iter()
                .filter(|w| rest.starts_with(*w))
                .max_by_key(|w| w.len())
                .expect("unknown word");
            rest = rest[word.len()..].trim_start_matches(' ');
            count += 1;
        }
        assert_eq!(count, 5);
        assert_eq!(random.words(0), "");
    }

    #[test]
    fn polygon_stays_in_range() {
        let mut random = RandomSource::new(5);
        let polygon = random.polygon();

        assert_eq!(polygon.kind, "polygon");
        assert_eq!(polygon.coordinates.len(), 4);
        for [lon, lat] in polygon.coordinates {
            assert!((-90.0..210.0).contains(&lon));
            assert!((-80.0..80.0).contains(&lat));
        }
    }

    #[test]
    fn same_seed_same_output() {
        let mut a = RandomSource::new(42);
        let mut b = RandomSource::new(42);
        assert_eq!(a.string(64), b.string(64));
    }
}
