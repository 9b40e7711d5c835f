//! Static UI string table
//!
//! The handful of user-visible messages this crate produces (degraded
//! states and the note-saved confirmation), in the four languages the UI
//! offers. Plain table lookup, no formatting engine.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En = 0,
    Fr = 1,
    De = 2,
    Es = 3,
}

impl Lang {
    /// Parse a language code, falling back to English.
    pub fn from_code(code: &str) -> Self {
        match code {
            "fr" => Lang::Fr,
            "de" => Lang::De,
            "es" => Lang::Es,
            _ => Lang::En,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Fr => "fr",
            Lang::De => "de",
            Lang::Es => "es",
        }
    }
}

const NO_RESULTS: [&str; 4] = [
    "No matching strains found.",
    "Aucune variété correspondante trouvée.",
    "Keine passenden Sorten gefunden.",
    "No se encontraron cepas coincidentes.",
];

const NO_DATA: [&str; 4] = [
    "No strain data available.",
    "Aucune donnée de variétés disponible.",
    "Keine Sortendaten verfügbar.",
    "No hay datos de cepas disponibles.",
];

const NO_EFFECT_DATA: [&str; 4] = [
    "No effect data available.",
    "Aucune donnée sur les effets disponible.",
    "Keine Effekt-Daten verfügbar.",
    "No hay datos de efectos disponibles.",
];

const NO_IMAGE: [&str; 4] = [
    "No image available.",
    "Aucune image disponible.",
    "Kein Bild verfügbar.",
    "No hay imagen disponible.",
];

const NO_DESC: [&str; 4] = [
    "No description available.",
    "Pas de description disponible.",
    "Keine Beschreibung verfügbar.",
    "No hay descripción disponible.",
];

const NOTE_SAVED: [&str; 4] = [
    "Note saved!",
    "Note enregistrée !",
    "Notiz gespeichert!",
    "¡Nota guardada!",
];

/// Look up a message by key. Unknown keys resolve to the empty string
/// rather than panicking.
pub fn tr(lang: Lang, key: &str) -> &'static str {
    let table = match key {
        "no_results" => &NO_RESULTS,
        "no_data" => &NO_DATA,
        "no_effect_data" => &NO_EFFECT_DATA,
        "no_image" => &NO_IMAGE,
        "no_desc" => &NO_DESC,
        "note_saved" => &NOTE_SAVED,
        _ => return "",
    };
    table[lang as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip_and_fallback() {
        assert_eq!(Lang::from_code("fr"), Lang::Fr);
        assert_eq!(Lang::from_code("de").code(), "de");
        assert_eq!(Lang::from_code("zz"), Lang::En);
    }

    #[test]
    fn every_key_resolves_in_every_language() {
        for lang in [Lang::En, Lang::Fr, Lang::De, Lang::Es] {
            for key in ["no_results", "no_data", "no_effect_data", "no_image", "no_desc", "note_saved"] {
                assert!(!tr(lang, key).is_empty(), "{key} missing for {:?}", lang);
            }
        }
    }

    #[test]
    fn unknown_key_is_empty() {
        assert_eq!(tr(Lang::En, "nonexistent"), "");
    }
}
