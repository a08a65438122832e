use crate::errors::ModelError;
use crate::usuario;

#[test]
fn nome_must_not_be_blank() {
    assert!(usuario::validate_nome("Maria").is_ok());
    assert!(matches!(usuario::validate_nome("  "), Err(ModelError::Validation(_))));
}

#[test]
fn email_requires_at_sign() {
    assert!(usuario::validate_email("bob@example.com").is_ok());
    assert!(matches!(usuario::validate_email("bob.example.com"), Err(ModelError::Validation(_))));
}

#[test]
fn tipo_is_a_closed_set() {
    assert!(usuario::validate_tipo(usuario::TIPO_CLIENTE).is_ok());
    assert!(usuario::validate_tipo(usuario::TIPO_CONSULTOR).is_ok());
    assert!(matches!(usuario::validate_tipo("Gerente"), Err(ModelError::Validation(_))));
    // tipo matching is case-sensitive, the stored tag is canonical
    assert!(usuario::validate_tipo("consultor").is_err());
}

#[test]
fn telefone_must_not_be_blank() {
    assert!(usuario::validate_telefone("11 91234-5678").is_ok());
    assert!(usuario::validate_telefone("").is_err());
}
