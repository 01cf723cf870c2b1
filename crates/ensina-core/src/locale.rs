/// User-facing strings, picked from the configured locale tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    PtBr,
    En,
}

impl Locale {
    /// Parse a tag like `pt-BR`, `pt`, `en_US`. Unknown tags give `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lang = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match lang.as_str() {
            "pt" => Some(Locale::PtBr),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Locale::PtBr => "pt-BR",
            Locale::En => "en",
        }
    }

    /// Appended to a reply the user stopped
    pub fn interrupted_notice(&self) -> &'static str {
        match self {
            Locale::PtBr => "\n\n(Geração interrompida)",
            Locale::En => "\n\n(Generation interrupted)",
        }
    }

    /// Appended to a reply that failed on the network or server
    pub fn error_notice(&self) -> &'static str {
        match self {
            Locale::PtBr => "\n\n(Ocorreu um erro ao obter a resposta)",
            Locale::En => "\n\n(An error occurred while getting the response)",
        }
    }

    pub fn user_label(&self) -> &'static str {
        match self {
            Locale::PtBr => "Usuário",
            Locale::En => "You",
        }
    }

    pub fn assistant_label(&self) -> &'static str {
        match self {
            Locale::PtBr => "Assistente",
            Locale::En => "Assistant",
        }
    }

    pub fn empty_hint(&self) -> &'static str {
        match self {
            Locale::PtBr => "Comece a conversar com o modelo — digite uma pergunta abaixo.",
            Locale::En => "Start chatting with the model — type a question below.",
        }
    }

    pub fn thinking(&self) -> &'static str {
        match self {
            Locale::PtBr => "Pensando",
            Locale::En => "Thinking",
        }
    }
}
