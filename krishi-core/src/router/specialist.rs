//! Specialist definitions.
//!
//! A specialist is a persona the router can dispatch to: an id the
//! classifier names, a system prompt for direct answers, and the keyword
//! list used when classification is unavailable.

/// A routable specialist.
#[derive(Debug, Clone, PartialEq)]
pub struct Specialist {
    /// Identifier used in routing decisions (e.g. `weather`).
    pub id: String,

    /// Heading used when several answers are combined.
    pub display_name: String,

    /// One-line description shown to the classifier.
    pub description: String,

    /// System instruction for direct (SIMPLE) answers.
    pub system_prompt: String,

    /// Lowercase keywords for the fallback router. Matched at word starts,
    /// so `crop` also matches `crops`.
    pub keywords: Vec<String>,

    /// Answers depend on where the user is (weather).
    pub location_sensitive: bool,

    /// Handles arithmetic in the query.
    pub computational: bool,
}

impl Specialist {
    /// Create a specialist with no keywords and no flags set.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            keywords: Vec::new(),
            location_sensitive: false,
            computational: false,
        }
    }

    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(|k| k.into().to_lowercase()).collect();
        self
    }

    #[must_use]
    pub fn location_sensitive(mut self) -> Self {
        self.location_sensitive = true;
        self
    }

    #[must_use]
    pub fn computational(mut self) -> Self {
        self.computational = true;
        self
    }

    /// Whether any keyword occurs at a word start in the normalized text.
    ///
    /// `normalized` must come from [`normalize_for_keywords`].
    pub(crate) fn matches(&self, normalized: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| normalized.contains(&format!(" {}", keyword)))
    }

    pub fn organic_farming() -> Self {
        Self::new(
            "organic_farming",
            "Organic Farming",
            "Organic farming, agriculture, crops, soil, pest management, sustainable farming",
            r#"You are an expert organic farming guide with deep knowledge of sustainable agriculture.

You help with:
- Organic crop cultivation and seasonal farming calendars
- Natural pest, disease and weed management
- Soil health, composting and organic fertilizers
- Crop rotation, companion planting and biodiversity
- Water conservation and organic certification
- Organic seed selection and saving

Be specific, explain why each practice works, and favour chemical-free, long-term solutions. If asked about non-organic methods, suggest organic alternatives."#,
        )
        .with_keywords([
            "organic", "farming", "agriculture", "crop", "soil", "compost",
            "fertilizer", "pest", "disease", "weed", "plant", "grow", "harvest",
            "seed", "irrigation", "cultivation", "sustainable", "natural",
            "pesticide", "herbicide", "rotation", "companion planting",
            "biodiversity", "ecosystem", "farm", "garden", "vegetables",
            "fruits", "grains", "livestock", "poultry", "dairy",
            "organic certification",
        ])
    }

    pub fn financial() -> Self {
        Self::new(
            "financial",
            "Financial",
            "Financial advice, calculations, budgeting, investments, loans, agricultural economics",
            r#"You are a knowledgeable financial advisor with a focus on farm and household finance.

You help with:
- Budgeting and financial planning
- Loans, interest and repayment calculations
- Investments, savings and insurance
- Farm economics: costs, revenue, profit and return on investment
- Tax and debt management

Show your calculations step by step. Remind users that this is general information and that they should consult a qualified professional for personal advice."#,
        )
        .with_keywords([
            "finance", "financial", "money", "budget", "investment", "loan",
            "mortgage", "interest", "tax", "retirement", "insurance", "savings",
            "profit", "loss", "revenue", "cost", "calculate", "calculation",
            "roi", "return", "portfolio", "stock", "bond", "mutual fund",
            "bank", "credit", "debt", "income", "expense", "cash flow",
            "compound", "simple interest", "npv", "irr", "payback period",
            "financial planning", "wealth", "asset", "liability", "equity",
        ])
        .computational()
    }

    pub fn weather() -> Self {
        Self::new(
            "weather",
            "Weather",
            "Weather information, forecasts, agricultural weather planning",
            r#"You are a weather and agricultural meteorology expert.

You help with:
- Current conditions and forecasts
- Seasonal patterns and their effect on crops
- Irrigation planning based on weather
- Weather-related pest and disease risk
- Choosing planting and harvesting times

Always relate the weather to practical farming decisions."#,
        )
        .with_keywords([
            "weather", "temperature", "rain", "precipitation", "humidity",
            "wind", "forecast", "climate", "sunny", "cloudy", "storm",
            "drought", "flood", "frost", "heat", "cold", "season",
            "monsoon", "winter", "summer", "spring", "autumn", "fall",
            "irrigation", "watering", "planting time", "harvest time",
            "growing season", "weather conditions", "atmospheric",
        ])
        .location_sensitive()
    }

    pub fn general() -> Self {
        Self::new(
            "general",
            "General",
            "General conversation and anything not covered by the other specialists",
            r#"You are a helpful, friendly assistant that is part of an agricultural advisory service.

You handle general questions, explanations, advice and conversation that do not need a farming, finance or weather specialist. Be clear, accurate and engaging."#,
        )
        .with_keywords([
            "hello", "hi", "help", "what", "how", "why", "when", "where",
            "explain", "tell me", "question", "general", "chat", "talk",
            "conversation", "advice", "suggestion", "idea", "think",
        ])
    }

    /// The four built-in specialists; `general` is last.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::organic_farming(),
            Self::financial(),
            Self::weather(),
            Self::general(),
        ]
    }
}

/// Lowercase the text and collapse every run of non-alphanumeric characters
/// into a single space, with a leading space so that word starts can be
/// found with `" keyword"`.
pub(crate) fn normalize_for_keywords(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len() + 1);
    normalized.push(' ');
    let mut last_space = true;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            normalized.push(c);
            last_space = false;
        } else if !last_space {
            normalized.push(' ');
            last_space = true;
        }
    }
    normalized
}
