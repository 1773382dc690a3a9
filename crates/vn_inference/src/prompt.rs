//! Assembly of the fact-checking prompt.

use vn_core::VerificationRequest;

/// Outlets the model is told to cross-reference. Not enforced on its answer.
pub const TRUSTED_SOURCES: &[&str] = &[
    "g1.globo.com",
    "nytimes.com",
    "uol.com.br",
    "estadao.com.br",
    "folha.uol.com.br",
    "bbc.com",
    "reuters.com",
    "ap.org",
    "cnn.com",
    "agenciabrasil.ebc.com.br",
];

/// Embedded instead of the claim when nothing textual was submitted.
pub const EMPTY_CONTENT_PLACEHOLDER: &str =
    "Conteúdo muito curto ou indefinido fornecido para análise";

const RESPONSE_SCHEMA: &str = r#"{
  "classification": "verified|false|partial",
  "score": 50,
  "explanation": "Explicação detalhada profissional em português",
  "criteria": [
    {"name": "Clareza do conteúdo", "status": true},
    {"name": "Presença em fontes confiáveis", "status": false},
    {"name": "Consistência com dados oficiais", "status": false}
  ],
  "sources": [
    {"name": "G1", "url": "https://g1.globo.com", "verified": false},
    {"name": "UOL", "url": "https://uol.com.br", "verified": false}
  ]
}"#;

fn claim_section(request: &VerificationRequest) -> String {
    let mut lines = Vec::new();
    if let Some(content) = request.content() {
        lines.push(format!("TEXTO/CONTEÚDO: {}", content));
    }
    if let Some(url) = request.url() {
        lines.push(format!("URL: {}", url));
    }
    if request.image().is_some() {
        lines.push("IMAGEM: Análise de imagem fornecida pelo usuário".to_string());
    }
    if request.content().is_none() && request.url().is_none() {
        lines.insert(0, EMPTY_CONTENT_PLACEHOLDER.to_string());
    }
    lines.join("\n")
}

pub fn build_prompt(request: &VerificationRequest, trusted_sources: &[&str]) -> String {
    format!(
        "Você é um verificador de fatos profissional brasileiro. Analise a seguinte informação e forneça uma verificação completa:

INFORMAÇÃO A VERIFICAR:
{claim}

INSTRUÇÕES IMPORTANTES:
1. Se o conteúdo for muito vago ou indefinido (como letras aleatórias), classifique como DUVIDOSA
2. Para URLs, analise o domínio e a credibilidade da fonte
3. Para imagens, indique que a análise visual não está totalmente disponível
4. Verifique a credibilidade consultando fontes confiáveis: {sources}
5. Classifique como: VERDADEIRA (verified), FALSA (false) ou DUVIDOSA (partial)
6. Dê uma pontuação de 0-100 para veracidade
7. Forneça explicação detalhada e profissional em português
8. Liste os critérios analisados
9. Identifique fontes relevantes

IMPORTANTE: Responda APENAS em JSON válido com esta estrutura exata:
{schema}",
        claim = claim_section(request),
        sources = trusted_sources.join(", "),
        schema = RESPONSE_SCHEMA,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vn_core::ImageAttachment;

    #[test]
    fn test_prompt_embeds_supplied_fields() {
        let request = VerificationRequest::new()
            .with_content("  Vacinas contêm microchips 5G  ")
            .with_url("https://g1.globo.com/algumanoticia");
        let prompt = build_prompt(&request, TRUSTED_SOURCES);

        assert!(prompt.contains("TEXTO/CONTEÚDO: Vacinas contêm microchips 5G\n"));
        assert!(prompt.contains("URL: https://g1.globo.com/algumanoticia"));
        assert!(!prompt.contains("IMAGEM:"));
        assert!(!prompt.contains(EMPTY_CONTENT_PLACEHOLDER));
        assert!(prompt.contains("agenciabrasil.ebc.com.br"));
        assert!(prompt.contains("\"classification\": \"verified|false|partial\""));
    }

    #[test]
    fn test_image_only_prompt_uses_placeholder() {
        let request = VerificationRequest::new()
            .with_image(ImageAttachment::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png"));
        let prompt = build_prompt(&request, &["reuters.com"]);

        assert!(prompt.contains(EMPTY_CONTENT_PLACEHOLDER));
        assert!(prompt.contains("IMAGEM: Análise de imagem fornecida pelo usuário"));
        assert!(prompt.contains("fontes confiáveis: reuters.com\n"));
    }
}
