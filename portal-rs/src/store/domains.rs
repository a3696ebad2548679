//! Domain queries

use tracing::info;
use uuid::Uuid;

use super::types::Domain;
use super::{is_unique_violation, Store};
use crate::error::{PortalError, Result};

type DomainRow = (String, String, bool, String);

fn row_to_domain(row: DomainRow) -> Domain {
    let (id, name, is_active, created_at) = row;
    Domain {
        id,
        name,
        is_active,
        created_at,
    }
}

/// DNS-style hostname: dot-separated labels, lowercase alphanumerics
/// with inner hyphens, alphabetic TLD of two or more characters.
pub fn is_valid_domain_name(name: &str) -> bool {
    let re = regex::Regex::new(r"^[a-z0-9]+([-.][a-z0-9]+)*\.[a-z]{2,}$")
        .expect("domain name pattern is valid");
    re.is_match(name)
}

impl Store {
    /// Create a domain. Names are normalized to lowercase and must be
    /// valid hostnames; duplicates are rejected.
    pub async fn create_domain(&self, name: &str) -> Result<Domain> {
        let name = name.trim().to_lowercase();

        if !is_valid_domain_name(&name) {
            return Err(PortalError::InvalidRequest(format!(
                "invalid domain name: {}",
                name
            )));
        }

        info!("Creating domain: {}", name);

        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();

        sqlx::query("INSERT INTO domains (id, name, is_active, created_at) VALUES (?, ?, 1, ?)")
            .bind(&id)
            .bind(&name)
            .bind(&created_at)
            .execute(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    PortalError::AlreadyExists(format!("domain {}", name))
                } else {
                    e.into()
                }
            })?;

        Ok(Domain {
            id,
            name,
            is_active: true,
            created_at,
        })
    }

    pub async fn find_domain(&self, id: &str) -> Result<Option<Domain>> {
        let row = sqlx::query_as::<_, DomainRow>(
            "SELECT id, name, is_active, created_at FROM domains WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(row_to_domain))
    }

    pub async fn list_domains(&self, include_inactive: bool) -> Result<Vec<Domain>> {
        let sql = if include_inactive {
            "SELECT id, name, is_active, created_at FROM domains ORDER BY name"
        } else {
            "SELECT id, name, is_active, created_at FROM domains WHERE is_active = 1 ORDER BY name"
        };

        let rows = sqlx::query_as::<_, DomainRow>(sql).fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(row_to_domain).collect())
    }

    /// Toggle whether new mailboxes may be provisioned under the domain.
    /// Existing mailboxes are not touched.
    pub async fn set_domain_active(&self, id: &str, active: bool) -> Result<Domain> {
        let result = sqlx::query("UPDATE domains SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound(format!("domain {}", id)));
        }

        self.find_domain(id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("domain {}", id)))
    }

    /// Delete a domain. Blocked while any mailbox row references it,
    /// including soft-deleted ones kept for audit.
    pub async fn delete_domain(&self, id: &str) -> Result<()> {
        let dependents = self.count_mailboxes_by_domain(id).await?;
        if dependents > 0 {
            return Err(PortalError::DependentsExist(format!(
                "domain has {} mailboxes",
                dependents
            )));
        }

        let result = sqlx::query("DELETE FROM domains WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound(format!("domain {}", id)));
        }

        info!("Domain {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_name_validation() {
        assert!(is_valid_domain_name("example.com"));
        assert!(is_valid_domain_name("mail.example.co.uk"));
        assert!(is_valid_domain_name("my-domain.io"));

        assert!(!is_valid_domain_name("example"));
        assert!(!is_valid_domain_name("-example.com"));
        assert!(!is_valid_domain_name("example..com"));
        assert!(!is_valid_domain_name("example.c"));
        assert!(!is_valid_domain_name("EXAMPLE.COM"));
    }

    #[tokio::test]
    async fn test_create_and_list_domains() {
        let store = Store::connect_in_memory().await.unwrap();

        let domain = store.create_domain("Example.COM").await.unwrap();
        assert_eq!(domain.name, "example.com");
        assert!(domain.is_active);

        let duplicate = store.create_domain("example.com").await;
        assert!(matches!(duplicate, Err(PortalError::AlreadyExists(_))));

        store.create_domain("other.org").await.unwrap();
        let all = store.list_domains(true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_inactive_domains_hidden_from_active_listing() {
        let store = Store::connect_in_memory().await.unwrap();

        let domain = store.create_domain("example.com").await.unwrap();
        store.set_domain_active(&domain.id, false).await.unwrap();

        assert!(store.list_domains(false).await.unwrap().is_empty());
        assert_eq!(store.list_domains(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_domain_name_rejected() {
        let store = Store::connect_in_memory().await.unwrap();
        let result = store.create_domain("not a domain").await;
        assert!(matches!(result, Err(PortalError::InvalidRequest(_))));
    }
}
