use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub public_url: String,
    pub vapi_api_key: String,
    pub vapi_base_url: String,
    pub vapi_webhook_secret: String,
    pub google_calendar_base_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_base_url: String,
    pub stripe_price_starter: String,
    pub stripe_price_pro: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "agentdesk.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            vapi_api_key: env::var("VAPI_API_KEY").unwrap_or_default(),
            vapi_base_url: env::var("VAPI_BASE_URL")
                .unwrap_or_else(|_| "https://api.vapi.ai".to_string()),
            vapi_webhook_secret: env::var("VAPI_WEBHOOK_SECRET").unwrap_or_default(),
            google_calendar_base_url: env::var("GOOGLE_CALENDAR_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            stripe_base_url: env::var("STRIPE_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string()),
            stripe_price_starter: env::var("STRIPE_PRICE_STARTER").unwrap_or_default(),
            stripe_price_pro: env::var("STRIPE_PRICE_PRO").unwrap_or_default(),
            email_api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            email_api_key: env::var("EMAIL_API_KEY").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "agentdesk <noreply@agentdesk.local>".to_string()),
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
        }
    }

    /// Stripe price id for a plan name, if that plan is sold.
    pub fn price_for_plan(&self, plan: &str) -> Option<&str> {
        let price = match plan {
            "starter" => &self.stripe_price_starter,
            "pro" => &self.stripe_price_pro,
            _ => return None,
        };
        (!price.is_empty()).then_some(price.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            stripe_price_starter: "price_starter".to_string(),
            stripe_price_pro: String::new(),
            ..AppConfig::from_env()
        }
    }

    #[test]
    fn test_price_for_known_plan() {
        assert_eq!(config().price_for_plan("starter"), Some("price_starter"));
    }

    #[test]
    fn test_price_for_unconfigured_plan() {
        assert_eq!(config().price_for_plan("pro"), None);
    }

    #[test]
    fn test_price_for_unknown_plan() {
        assert_eq!(config().price_for_plan("enterprise"), None);
    }
}
