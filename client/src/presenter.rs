//! Turns an analysis into an ordered list of report sections.
//!
//! Every section is optional. A missing or empty field drops its section and never
//! produces an error.

use shared::{
    ActorMode, AnalysisResult, HarmfulIngredient, HealthBand, NutritionalInfo, Recommendation,
    ScanRecord,
};
use std::fmt;

pub const SUGAR_DAILY_G: f64 = 50.0;
pub const SODIUM_DAILY_MG: f64 = 2300.0;
pub const PERSONAL_ADVICE_LOCKED: &str = "Login to get personal advices";

#[derive(Debug, Clone, PartialEq)]
pub struct NutritionView {
    pub sugar_g: Option<f64>,
    pub sugar_share: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub sodium_share: Option<f64>,
    pub calories_per_serving: Option<f64>,
    pub serving_size: Option<String>,
}

impl NutritionView {
    fn from_info(info: &NutritionalInfo) -> Option<Self> {
        let view = Self {
            sugar_g: info.total_sugar,
            sugar_share: info.total_sugar.map(|g| share(g, SUGAR_DAILY_G)),
            sodium_mg: info.total_sodium,
            sodium_share: info.total_sodium.map(|mg| share(mg, SODIUM_DAILY_MG)),
            calories_per_serving: info.calories_per_serving,
            serving_size: non_empty(info.serving_size.as_deref()),
        };
        let any = view.sugar_g.is_some()
            || view.sodium_mg.is_some()
            || view.calories_per_serving.is_some()
            || view.serving_size.is_some();
        any.then_some(view)
    }
}

/// Percentage of a daily reference amount, clamped to 0..=100.
pub fn share(amount: f64, daily: f64) -> f64 {
    (amount / daily * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonalAdvice {
    Notes(String),
    Locked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    HealthImpact(String),
    HealthScore { score: u32, band: HealthBand },
    Verdict { should_eat: String, reason: Option<String> },
    Nutrition(NutritionView),
    HarmfulIngredients(Vec<HarmfulIngredient>),
    HealthyAlternatives(Vec<String>),
    Recommendations(Vec<Recommendation>),
    PersonalAdvice(PersonalAdvice),
    ExtractedText(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub sections: Vec<Section>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn health_score(&self) -> Option<(u32, HealthBand)> {
        self.sections.iter().find_map(|s| match s {
            Section::HealthScore { score, band } => Some((*score, *band)),
            _ => None,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn non_empty_list<T: Clone>(items: Option<&Vec<T>>) -> Option<Vec<T>> {
    items.filter(|items| !items.is_empty()).cloned()
}

pub fn build_report(result: &AnalysisResult, mode: ActorMode) -> ScanReport {
    report_with(result, mode, HealthBand::from_score)
}

/// Report for a saved scan from the history endpoints.
pub fn build_record_report(record: &ScanRecord, mode: ActorMode) -> ScanReport {
    let result = AnalysisResult {
        extracted_text: record.extracted_text.clone().unwrap_or_default(),
        analysis: record.analysis.clone(),
    };
    report_with(&result, mode, HealthBand::from_saved_score)
}

fn report_with(result: &AnalysisResult, mode: ActorMode, band: fn(u32) -> HealthBand) -> ScanReport {
    let analysis = &result.analysis;
    let mut sections = Vec::new();

    if let Some(impact) = non_empty(analysis.health_impact.as_deref()) {
        sections.push(Section::HealthImpact(impact));
    }
    if let Some(score) = analysis.health_score {
        sections.push(Section::HealthScore {
            score,
            band: band(score),
        });
    }
    if let Some(should_eat) = non_empty(analysis.should_eat.as_deref()) {
        sections.push(Section::Verdict {
            should_eat,
            reason: non_empty(analysis.should_eat_reason.as_deref()),
        });
    }
    if let Some(nutrition) = analysis
        .nutritional_info
        .as_ref()
        .and_then(NutritionView::from_info)
    {
        sections.push(Section::Nutrition(nutrition));
    }
    if let Some(ingredients) = non_empty_list(analysis.harmful_ingredients.as_ref()) {
        sections.push(Section::HarmfulIngredients(ingredients));
    }
    if let Some(alternatives) = non_empty_list(analysis.healthy_alternatives.as_ref()) {
        sections.push(Section::HealthyAlternatives(alternatives));
    }
    if let Some(recommendations) = non_empty_list(analysis.recommendations.as_ref()) {
        sections.push(Section::Recommendations(recommendations));
    }
    match (mode, non_empty(analysis.additional_notes.as_deref())) {
        (ActorMode::Guest, _) => sections.push(Section::PersonalAdvice(PersonalAdvice::Locked)),
        (ActorMode::Authenticated, Some(notes)) => {
            sections.push(Section::PersonalAdvice(PersonalAdvice::Notes(notes)))
        }
        (ActorMode::Authenticated, None) => {}
    }
    if let Some(text) = non_empty(Some(result.extracted_text.as_str())) {
        sections.push(Section::ExtractedText(text));
    }

    ScanReport { sections }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::HealthImpact(impact) => writeln!(f, "Health impact: {}", impact),
            Section::HealthScore { score, band } => {
                writeln!(f, "Health score: {}/100 ({})", score, band)
            }
            Section::Verdict { should_eat, reason } => match reason {
                Some(reason) => writeln!(f, "Should you eat this? {}: {}", should_eat, reason),
                None => writeln!(f, "Should you eat this? {}", should_eat),
            },
            Section::Nutrition(n) => {
                writeln!(f, "Nutritional information:")?;
                if let (Some(g), Some(pct)) = (n.sugar_g, n.sugar_share) {
                    writeln!(f, "  Sugar: {}g ({:.0}% of {}g)", g, pct, SUGAR_DAILY_G)?;
                }
                if let (Some(mg), Some(pct)) = (n.sodium_mg, n.sodium_share) {
                    writeln!(f, "  Sodium: {}mg ({:.0}% of {}mg)", mg, pct, SODIUM_DAILY_MG)?;
                }
                if let Some(kcal) = n.calories_per_serving {
                    writeln!(f, "  Calories per serving: {}", kcal)?;
                }
                if let Some(size) = &n.serving_size {
                    writeln!(f, "  Serving size: {}", size)?;
                }
                Ok(())
            }
            Section::HarmfulIngredients(ingredients) => {
                writeln!(f, "Ingredients of concern:")?;
                for ingredient in ingredients {
                    writeln!(
                        f,
                        "  - {} [{} risk]: {}",
                        ingredient.name, ingredient.severity, ingredient.warning
                    )?;
                    if let Some(alternative) = non_empty(ingredient.alternative.as_deref()) {
                        writeln!(f, "    Better alternative: {}", alternative)?;
                    }
                }
                Ok(())
            }
            Section::HealthyAlternatives(alternatives) => {
                writeln!(f, "Healthy alternatives:")?;
                for alternative in alternatives {
                    writeln!(f, "  - {}", alternative)?;
                }
                Ok(())
            }
            Section::Recommendations(recommendations) => {
                writeln!(f, "Health recommendations:")?;
                for rec in recommendations {
                    writeln!(f, "  - [{}] {}: {}", rec.kind, rec.title, rec.message)?;
                }
                Ok(())
            }
            Section::PersonalAdvice(PersonalAdvice::Notes(notes)) => {
                writeln!(f, "Personal advice: {}", notes)
            }
            Section::PersonalAdvice(PersonalAdvice::Locked) => {
                writeln!(f, "Personal advice: {}", PERSONAL_ADVICE_LOCKED)
            }
            Section::ExtractedText(text) => {
                writeln!(f, "Extracted text:")?;
                for line in text.lines() {
                    writeln!(f, "  {}", line)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            write!(f, "{}", section)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::Severity;

    fn parse(raw: serde_json::Value) -> AnalysisResult {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn full_result_keeps_section_order() {
        let result = parse(json!({
            "extractedText": "Sugar, palm oil",
            "analysis": {
                "healthScore": 72,
                "healthImpact": "Moderate",
                "shouldEat": "Yes",
                "shouldEatReason": "In moderation",
                "nutritionalInfo": { "totalSugar": 60, "totalSodium": 1150 },
                "harmfulIngredients": [{ "name": "Palm oil", "severity": "Medium", "warning": "Saturated fat" }],
                "healthyAlternatives": ["Oat bar"],
                "recommendations": [{ "title": "Limit", "message": "One a day", "type": "warning" }],
                "additionalNotes": "Watch your sugar intake"
            }
        }));

        let report = build_report(&result, ActorMode::Authenticated);
        assert_eq!(report.sections.len(), 9);
        assert!(matches!(report.sections[0], Section::HealthImpact(_)));
        assert_eq!(report.health_score(), Some((72, HealthBand::Good)));
        assert!(matches!(report.sections[2], Section::Verdict { .. }));
        assert!(matches!(
            report.sections[7],
            Section::PersonalAdvice(PersonalAdvice::Notes(_))
        ));
        assert!(matches!(report.sections[8], Section::ExtractedText(_)));

        let Section::Nutrition(nutrition) = &report.sections[3] else {
            panic!("expected nutrition at index 3");
        };
        assert_eq!(nutrition.sugar_share, Some(100.0));
        assert_eq!(nutrition.sodium_share, Some(50.0));

        let Section::HarmfulIngredients(ingredients) = &report.sections[4] else {
            panic!("expected ingredients at index 4");
        };
        assert_eq!(ingredients[0].severity, Severity::Medium);
    }

    #[test]
    fn absent_and_empty_sections_are_skipped() {
        let result = parse(json!({
            "extractedText": "",
            "analysis": {
                "healthScore": 30,
                "harmfulIngredients": [],
                "healthyAlternatives": [],
                "nutritionalInfo": {},
                "shouldEat": ""
            }
        }));

        let report = build_report(&result, ActorMode::Authenticated);
        assert_eq!(
            report.sections,
            vec![Section::HealthScore {
                score: 30,
                band: HealthBand::Poor
            }]
        );
    }

    #[test]
    fn guests_see_locked_personal_advice() {
        let result = parse(json!({
            "analysis": { "additionalNotes": "Avoid if diabetic" }
        }));

        let report = build_report(&result, ActorMode::Guest);
        assert_eq!(
            report.sections,
            vec![Section::PersonalAdvice(PersonalAdvice::Locked)]
        );
        assert!(report.to_string().contains(PERSONAL_ADVICE_LOCKED));
        assert!(!report.to_string().contains("diabetic"));
    }

    #[test]
    fn rendered_text_includes_bands_and_shares() {
        let result = parse(json!({
            "extractedText": "line one\nline two",
            "analysis": {
                "healthScore": 85,
                "nutritionalInfo": { "totalSugar": 5, "servingSize": "30g" },
                "recommendations": [{ "title": "Nice", "message": "Good pick", "type": "positive" }]
            }
        }));

        let text = build_report(&result, ActorMode::Authenticated).to_string();
        assert!(text.contains("Health score: 85/100 (Excellent)"));
        assert!(text.contains("Sugar: 5g (10% of 50g)"));
        assert!(text.contains("Serving size: 30g"));
        assert!(text.contains("[positive] Nice: Good pick"));
        assert!(text.contains("  line two"));
    }

    #[test]
    fn share_is_clamped() {
        assert_eq!(share(120.0, SUGAR_DAILY_G), 100.0);
        assert_eq!(share(-5.0, SUGAR_DAILY_G), 0.0);
        assert_eq!(share(1150.0, SODIUM_DAILY_MG), 50.0);
    }

    #[test]
    fn saved_scans_band_fair_from_forty() {
        let record: ScanRecord = serde_json::from_value(json!({
            "_id": "65f0",
            "createdAt": "2026-10-18T09:30:00Z",
            "extractedText": null,
            "analysis": { "healthScore": 42 }
        }))
        .unwrap();

        let saved = build_record_report(&record, ActorMode::Authenticated);
        assert_eq!(saved.health_score(), Some((42, HealthBand::Fair)));
        assert_eq!(saved.sections.len(), 1);

        let fresh = build_report(
            &AnalysisResult {
                extracted_text: String::new(),
                analysis: record.analysis.clone(),
            },
            ActorMode::Authenticated,
        );
        assert_eq!(fresh.health_score(), Some((42, HealthBand::Poor)));
    }
}
