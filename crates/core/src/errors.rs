use thiserror::Error;

use crate::domain::meetup::MeetupId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("meetup {0} was not found")]
    NotFound(MeetupId),
    #[error("caller is not allowed to delete meetups")]
    PermissionDenied,
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("meetup store is corrupt: {0}")]
    CorruptStore(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { field: &'static str, message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Chat-facing text. Validation and not-found messages carry their
    /// detail because the user has to fix the input; `message` itself stays
    /// in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { field, .. } => {
                format!("Los datos de la quedada no son válidos: {}", field_hint(field))
            }
            Self::NotFound { message, .. } => message.clone(),
            Self::Forbidden { .. } => "No tienes permisos para eliminar quedadas".to_owned(),
            Self::ServiceUnavailable { .. } => {
                "Ha ocurrido un error al guardar las quedadas. Inténtalo de nuevo.".to_owned()
            }
            Self::Internal { .. } => "Ha ocurrido un error inesperado.".to_owned(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

fn field_hint(field: &str) -> &'static str {
    match field {
        "title" => "el título no puede estar vacío.",
        "description" => "la descripción no puede estar vacía.",
        "date" => "la fecha u hora no existe en el calendario.",
        "status" => "el estado debe ser `activo` o `pendiente`.",
        "id" => "el ID de la quedada debe ser un número entero positivo.",
        _ => "revisa los valores introducidos.",
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Validation { field, reason }) => {
                Self::BadRequest { field, message: reason, correlation_id }
            }
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::Internal { message, correlation_id }
            }
            ApplicationError::NotFound(id) => Self::NotFound {
                message: format!("No se encontró ninguna quedada con ID {id}"),
                correlation_id,
            },
            ApplicationError::PermissionDenied => {
                Self::Forbidden { message: "delete requires manage permission".to_owned(), correlation_id }
            }
            ApplicationError::Storage(message) => Self::ServiceUnavailable { message, correlation_id },
            ApplicationError::CorruptStore(message) | ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::meetup::MeetupId;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn validation_error_maps_to_bad_request_with_reason() {
        let interface = ApplicationError::from(DomainError::Validation {
            field: "title",
            reason: "title must not be empty".to_owned(),
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, ref message, .. }
                if correlation_id == "req-1" && message.contains("title")
        ));
        assert_eq!(
            interface.user_message(),
            "Los datos de la quedada no son válidos: el título no puede estar vacío."
        );
    }

    #[test]
    fn validation_reasons_are_rendered_in_spanish_per_field() {
        for (field, expected) in [
            ("description", "la descripción no puede estar vacía."),
            ("date", "la fecha u hora no existe en el calendario."),
            ("status", "el estado debe ser `activo` o `pendiente`."),
        ] {
            let interface = ApplicationError::from(DomainError::Validation {
                field,
                reason: format!("{field} is invalid"),
            })
            .into_interface("req-1");

            let text = interface.user_message();
            assert!(text.ends_with(expected), "unexpected text for {field}: {text}");
            assert!(!text.contains("invalid"), "english detail leaked for {field}: {text}");
        }
    }

    #[test]
    fn not_found_names_the_missing_id() {
        let interface = ApplicationError::NotFound(MeetupId(42)).into_interface("req-2");

        assert_eq!(interface.correlation_id(), "req-2");
        assert_eq!(interface.user_message(), "No se encontró ninguna quedada con ID 42");
    }

    #[test]
    fn permission_denied_maps_to_forbidden() {
        let interface = ApplicationError::PermissionDenied.into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Forbidden { .. }));
        assert_eq!(interface.user_message(), "No tienes permisos para eliminar quedadas");
    }

    #[test]
    fn storage_failure_maps_to_service_unavailable() {
        let interface =
            ApplicationError::Storage("disk full".to_owned()).into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert!(!interface.user_message().contains("disk full"));
    }

    #[test]
    fn corrupt_store_maps_to_internal() {
        let interface =
            ApplicationError::CorruptStore("expected value at line 1".to_owned()).into_interface("req-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "Ha ocurrido un error inesperado.");
    }
}
