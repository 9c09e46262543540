// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "en";

// Catálogos embutidos no binário: chave -> mensagem
const CATALOGS: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("th", include_str!("../../locales/th.json")),
];

#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn embedded() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Catálogo '{}' inválido: {}", lang, e))?;
            catalogs.insert(lang.to_string(), messages);
        }
        Ok(Self { catalogs })
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs.contains_key(lang)
    }

    /// Busca a mensagem no idioma pedido, cai para o inglês e, por fim, devolve a própria chave.
    pub fn translate(&self, lang: &str, key: &str, params: &[(&str, String)]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .and_then(|messages| messages.get(key))
            .or_else(|| {
                self.catalogs
                    .get(DEFAULT_LANG)
                    .and_then(|messages| messages.get(key))
            });

        let Some(template) = template else {
            return key.to_string();
        };

        params.iter().fold(template.clone(), |message, (name, value)| {
            message.replace(&format!("{{{}}}", name), value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_english_key_has_a_thai_translation() {
        let store = I18nStore::embedded().unwrap();
        let en = &store.catalogs["en"];
        let th = &store.catalogs["th"];
        let missing: Vec<&String> = en.keys().filter(|k| !th.contains_key(*k)).collect();
        assert!(missing.is_empty(), "faltando em th: {:?}", missing);
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let store = I18nStore::embedded().unwrap();
        assert_eq!(
            store.translate("pt", "customer_not_found", &[]),
            store.translate("en", "customer_not_found", &[])
        );
        assert_eq!(store.translate("en", "no.such.key", &[]), "no.such.key");
    }

    #[test]
    fn params_are_interpolated() {
        let store = I18nStore::embedded().unwrap();
        let msg = store.translate("en", "duplicate_phone", &[("phone", "0812345678".into())]);
        assert!(msg.contains("0812345678"));
    }
}
