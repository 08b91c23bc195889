use std::collections::{HashMap, HashSet};

/// WordNet noun detachment rules, tried in order against the surface form.
/// Irregular plurals such as `leaves` come from the exception table instead.
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("s", ""),
    ("ses", "s"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

/// Dictionary-validated noun lemmatizer.
///
/// Candidates come from the exception table or the suffix rules; only forms
/// present in the lexicon survive, and the shortest survivor wins.
#[derive(Debug, Clone, Default)]
pub struct Lemmatizer {
    lexicon: HashSet<String>,
    exceptions: HashMap<String, Vec<String>>,
}

impl Lemmatizer {
    /// Parse a lexicon file: `lemma` lines declare base forms,
    /// `inflected<whitespace>lemma` lines declare irregular forms.
    pub fn from_lexicon(src: &str) -> Self {
        let mut lem = Lemmatizer::default();
        for line in src.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(first) = parts.next() else { continue };
            let first = first.to_lowercase();
            match parts.next() {
                Some(lemma) => {
                    let lemma = lemma.to_lowercase();
                    lem.lexicon.insert(lemma.clone());
                    lem.exceptions.entry(first).or_default().push(lemma);
                }
                None => {
                    lem.lexicon.insert(first);
                }
            }
        }
        lem
    }

    /// Build from WordNet's own database files: `index.noun` supplies the
    /// lemma set, `noun.exc` the irregular forms. Multi-word lemmas keep
    /// their underscores and never match a single token.
    pub fn from_wordnet(index_noun: &str, noun_exc: &str) -> Self {
        let mut lem = Lemmatizer::default();
        for line in index_noun.lines() {
            // license header lines are indented
            if line.starts_with(' ') {
                continue;
            }
            if let Some(lemma) = line.split_whitespace().next() {
                lem.lexicon.insert(lemma.to_lowercase());
            }
        }
        for line in noun_exc.lines() {
            let mut parts = line.split_whitespace();
            let Some(inflected) = parts.next() else { continue };
            let bases: Vec<String> = parts.map(str::to_lowercase).collect();
            if !bases.is_empty() {
                lem.exceptions
                    .entry(inflected.to_lowercase())
                    .or_default()
                    .extend(bases);
            }
        }
        lem
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    pub fn lemmatize<'a>(&self, word: &'a str) -> std::borrow::Cow<'a, str> {
        let candidates: Vec<String> = match self.exceptions.get(word) {
            Some(forms) => std::iter::once(word.to_string())
                .chain(forms.iter().cloned())
                .collect(),
            None => std::iter::once(word.to_string())
                .chain(SUFFIX_RULES.iter().filter_map(|(old, new)| {
                    word.strip_suffix(old).map(|stem| format!("{stem}{new}"))
                }))
                .collect(),
        };

        let mut best: Option<String> = None;
        for c in candidates {
            if !self.lexicon.contains(&c) {
                continue;
            }
            match &best {
                Some(b) if b.len() <= c.len() => {}
                _ => best = Some(c),
            }
        }

        match best {
            Some(b) if b != word => std::borrow::Cow::Owned(b),
            _ => std::borrow::Cow::Borrowed(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lemmatizer {
        Lemmatizer::from_lexicon(
            "# base forms\nphone\nbattery\nglass\nbox\nwoman\nleaf\nbus\ncamera\n\n\
             children child\nmice mouse\nleaves leaf\n",
        )
    }

    #[test]
    fn regular_plurals() {
        let l = lexicon();
        assert_eq!(l.lemmatize("phones"), "phone");
        assert_eq!(l.lemmatize("batteries"), "battery");
        assert_eq!(l.lemmatize("glasses"), "glass");
        assert_eq!(l.lemmatize("boxes"), "box");
        assert_eq!(l.lemmatize("women"), "woman");
        assert_eq!(l.lemmatize("leaves"), "leaf");
    }

    #[test]
    fn irregular_exceptions() {
        let l = lexicon();
        assert_eq!(l.lemmatize("children"), "child");
        assert_eq!(l.lemmatize("mice"), "mouse");
    }

    #[test]
    fn base_forms_are_stable() {
        let l = lexicon();
        for w in ["phone", "glass", "bus", "camera", "child"] {
            assert_eq!(l.lemmatize(w), w);
            assert_eq!(l.lemmatize(&l.lemmatize(w)), l.lemmatize(w));
        }
    }

    #[test]
    fn wordnet_database_files() {
        let index = "  1 This software and database is being provided to you, the LICENSEE, by\n  \
                     2 Princeton University under the following license.\n\
                     drop n 13 6 @ ~ #p %p + ; 13 7 15298472 03255167\n\
                     goose n 2 4 @ ~ #m %p 2 1 01858313 07643981\n\
                     pixel n 1 2 @ %p 1 0 04960277\n\
                     scratch n 5 5 @ ~ + ; 5 2 14291010 09997834\n\
                     pixel_density n 1 1 @ 1 0 05025413\n";
        let exc = "geese goose\nleaves leaf leave\n";
        let l = Lemmatizer::from_wordnet(index, exc);
        assert_eq!(l.len(), 5);
        assert_eq!(l.lemmatize("scratches"), "scratch");
        assert_eq!(l.lemmatize("drops"), "drop");
        assert_eq!(l.lemmatize("pixels"), "pixel");
        assert_eq!(l.lemmatize("geese"), "goose");
        // neither exception target is indexed, so the surface form stays
        assert_eq!(l.lemmatize("leaves"), "leaves");
        assert_eq!(l.lemmatize("princeton"), "princeton");
    }

    #[test]
    fn unknown_words_pass_through() {
        let l = lexicon();
        assert_eq!(l.lemmatize("awesome"), "awesome");
        assert_eq!(l.lemmatize("was"), "was");
    }
}
