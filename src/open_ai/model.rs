use std::fmt::Display;

pub enum Model {
    Gpt4oMini,
}

impl Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Model::Gpt4oMini => "gpt-4o-mini".to_string(),
            }
        )
    }
}
