use crate::common::error::AppError;

/// Se o erro for uma violação de chave única, devolve o nome da constraint.
pub(crate) fn unique_violation(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Converte violações de chave única com `on_unique`; os demais erros viram `DatabaseError`.
pub(crate) fn map_unique_violation<F>(e: sqlx::Error, on_unique: F) -> AppError
where
    F: FnOnce(&str) -> AppError,
{
    match unique_violation(&e) {
        Some(constraint) => on_unique(&constraint),
        None => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_pass_through() {
        assert!(unique_violation(&sqlx::Error::RowNotFound).is_none());

        let mapped = map_unique_violation(sqlx::Error::RowNotFound, |_| AppError::EmailAlreadyExists);
        assert!(matches!(mapped, AppError::DatabaseError(sqlx::Error::RowNotFound)));
    }
}
