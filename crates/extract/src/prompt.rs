pub fn build_triplet_prompt(chunk_text: &str) -> String {
    format!(
        r#"Extract business-related subject-predicate-object triplets from the following text.

INSTRUCTIONS:
1. Only extract factual business relationships stated in the text
2. Output ONLY a JSON array, nothing else
3. Use the exact schema below

SCHEMA:
[
  {{"subject": "Acme Corp", "subject_type": "company", "predicate": "acquired", "object": "Widget Inc", "object_type": "company", "confidence": 0.9}}
]

RULES:
- subject_type and object_type: company, person, product, financial_metric, percentage, monetary_value, date, market, location
- predicate: a short verb phrase such as increased, decreased, acquired, partnered, launched, invested
- confidence: a number between 0 and 1 for how clearly the text states the relationship
- Use names exactly as they appear in the text
- Output [] if the text states no business relationships

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}
