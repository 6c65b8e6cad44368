// Filename template expansion.
//
// Mirrors the two-phase shape of the original template engine: `compile`
// tokenizes the template into a run of literal and variable pieces once,
// `expand` substitutes bound values (and `_` for anything unbound) on
// every call. Delimiter is `%var%`.

use chrono::{DateTime, Local};

/// Variables available for substitution. `entry` and `total_msec` are
/// supplied by the capture engine; the rest are wall-clock fields.
#[derive(Debug, Clone)]
pub struct TemplateVars {
    pub year: i32,
    pub month: String,
    pub day: u32,
    pub hour: u32,
    pub min: u32,
    pub sec: u32,
    pub entry: u64,
    pub total_msec: u64,
}

impl TemplateVars {
    pub fn from_wall_time(now: DateTime<Local>, entry: u64, total_msec: u64) -> Self {
        use chrono::Datelike;
        use chrono::Timelike;
        TemplateVars {
            year: now.year(),
            month: now.format("%B").to_string(),
            day: now.day(),
            hour: now.hour(),
            min: now.minute(),
            sec: now.second(),
            entry,
            total_msec,
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "year" => Some(self.year.to_string()),
            "month" => Some(self.month.clone()),
            "day" => Some(format!("{:02}", self.day)),
            "hour" => Some(format!("{:02}", self.hour)),
            "min" => Some(format!("{:02}", self.min)),
            "sec" => Some(format!("{:02}", self.sec)),
            "entry" => Some(self.entry.to_string()),
            "total_msec" => Some(self.total_msec.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Token {
    Literal(String),
    Variable(String),
}

/// A template compiled into literal/variable runs, ready for repeated
/// expansion against different [`TemplateVars`].
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    tokens: Vec<Token>,
}

impl CompiledTemplate {
    fn compile(template: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal_start = 0;
        let mut cursor = 0;

        while let Some(rel) = template[cursor..].find('%') {
            let percent = cursor + rel;
            match template[percent + 1..].find('%') {
                Some(rel_end) => {
                    let var_start = percent + 1;
                    let var_end = var_start + rel_end;
                    if percent > literal_start {
                        tokens.push(Token::Literal(template[literal_start..percent].to_string()));
                    }
                    tokens.push(Token::Variable(template[var_start..var_end].to_string()));
                    literal_start = var_end + 1;
                    cursor = var_end + 1;
                }
                // Unmatched '%': treat the rest of the template as literal.
                None => break,
            }
        }
        if literal_start < template.len() {
            tokens.push(Token::Literal(template[literal_start..].to_string()));
        }
        CompiledTemplate { tokens }
    }

    fn expand(&self, vars: &TemplateVars) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Variable(name) => out.push_str(&vars.lookup(name).unwrap_or_else(|| "_".to_string())),
            }
        }
        out
    }
}

/// Expands a filename template into a concrete output filename.
pub trait TemplateExpander {
    fn expand(&self, template: &str, vars: &TemplateVars) -> String;
}

/// Compiles and substitutes `%var%`-delimited templates.
#[derive(Debug, Default, Clone)]
pub struct SimpleTemplateExpander;

impl SimpleTemplateExpander {
    pub fn new() -> Self {
        SimpleTemplateExpander
    }
}

impl TemplateExpander for SimpleTemplateExpander {
    fn expand(&self, template: &str, vars: &TemplateVars) -> String {
        CompiledTemplate::compile(template).expand(vars)
    }
}
