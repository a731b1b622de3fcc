//! System instructions for bill field extraction.
//!
//! The instruction is loaded once at startup and never changes afterwards.
//! Callers override the built-in default through
//! [`crate::config::ExtractorConfig::system_prompt`], either inline or from a
//! file via [`load_system_prompt`].

use crate::error::ExtractError;
use std::path::Path;

/// Default system prompt for Equatorial Goiás electricity bills.
///
/// Used when `ExtractorConfig::system_prompt` is `None`. The model receives
/// the bill's extracted text as the user message; dates in that text have
/// already been rewritten to `YYYY-MM-DD`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"Você é um especialista em faturas de energia elétrica da distribuidora Equatorial Goiás.
Sua tarefa é ler o texto extraído de uma fatura e devolver os campos abaixo em um único objeto JSON.

Regras:

1. FORMATO
   - Responda SOMENTE com o objeto JSON, sem comentários e sem blocos de código
   - Use exatamente as chaves listadas abaixo, em snake_case
   - Campo ausente na fatura: use null (nunca invente valores)

2. VALORES
   - Copie valores monetários e quantidades como aparecem na fatura (ex.: "1.234,56")
   - Datas já estão no formato AAAA-MM-DD; mantenha esse formato
   - Não inclua o símbolo "R$" nem unidades ("kWh") nos valores

3. CAMPOS
   - distribuidora
   - unidade_consumidora
   - numero_cliente
   - nome_titular
   - cpf_cnpj
   - endereco
   - classe_subclasse
   - modalidade_tarifaria
   - mes_referencia
   - data_emissao
   - data_vencimento
   - leitura_anterior
   - leitura_atual
   - proxima_leitura
   - dias_faturados
   - consumo_kwh
   - valor_total
   - itens_faturados: lista de objetos { descricao, quantidade, tarifa, valor }
   - tributos: objeto { icms: { base, aliquota, valor }, pis: { base, aliquota, valor }, cofins: { base, aliquota, valor } }
   - historico_consumo: lista de objetos { mes, consumo_kwh }
   - bandeira_tarifaria
   - codigo_barras"#;

/// Read a system prompt from a UTF-8 text file.
///
/// Leading and trailing whitespace is trimmed. An empty file is rejected.
pub fn load_system_prompt(path: impl AsRef<Path>) -> Result<String, ExtractError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        ExtractError::InvalidConfig(format!(
            "cannot read system prompt '{}': {e}",
            path.display()
        ))
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractError::InvalidConfig(format!(
            "system prompt file '{}' is empty",
            path.display()
        )));
    }
    Ok(text.to_string())
}
