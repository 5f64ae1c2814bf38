//! Identity resolution: from validated access-token claims to a principal.

use crate::db::Database;
use crate::jwt::IdentityClaim;

use super::types::Principal;

/// Resolve a validated identity claim to a principal.
///
/// The claim shape picks the lookup: a numeric account id resolves by id,
/// an (email, provider) pair resolves by that pair. A token carries exactly
/// one shape, and the id shape takes priority by construction. "Not found"
/// is a normal outcome (`Ok(None)`), not an error; the caller decides
/// whether to proceed unauthenticated or reject.
pub async fn resolve_identity(
    db: &Database,
    identity: &IdentityClaim,
) -> Result<Option<Principal>, sqlx::Error> {
    let account = match identity {
        IdentityClaim::Local { account_id } => db.accounts().find_by_id(*account_id).await?,
        IdentityClaim::Social { email, provider } => {
            db.accounts()
                .find_by_email_and_provider(email, *provider)
                .await?
        }
    };
    Ok(account.map(|account| Principal::from(&account)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Provider, Role};

    #[tokio::test]
    async fn test_resolve_by_account_id() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .accounts()
            .create_local("alice", "h", "Alice", Some("alice@example.com"))
            .await
            .unwrap();

        let principal = resolve_identity(&db, &IdentityClaim::Local { account_id: id })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.account_id, id);
        assert_eq!(principal.username, "alice@example.com");
        assert_eq!(principal.role, Role::User);
    }

    #[tokio::test]
    async fn test_resolve_by_email_and_provider() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .accounts()
            .create_social("bob@x.com", Provider::Google, "bob")
            .await
            .unwrap();

        let identity = IdentityClaim::Social {
            email: "bob@x.com".to_string(),
            provider: Provider::Google,
        };
        let principal = resolve_identity(&db, &identity).await.unwrap().unwrap();
        assert_eq!(principal.account_id, id);
        assert_eq!(principal.username, "bob@x.com");
    }

    #[tokio::test]
    async fn test_id_claim_wins_over_matching_email() {
        let db = Database::open(":memory:").await.unwrap();
        // Two accounts share an email across providers: a local account
        // with the address on file, and a Google account
        let local = db
            .accounts()
            .create_local("carol", "h", "Carol", Some("carol@x.com"))
            .await
            .unwrap();
        let social = db
            .accounts()
            .create_social("carol@x.com", Provider::Google, "carol-g")
            .await
            .unwrap();

        // An id-shaped claim resolves through the id path only
        let by_id = resolve_identity(&db, &IdentityClaim::Local { account_id: local })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.account_id, local);

        // A pair-shaped claim resolves through the pair path only
        let identity = IdentityClaim::Social {
            email: "carol@x.com".to_string(),
            provider: Provider::Google,
        };
        let by_pair = resolve_identity(&db, &identity).await.unwrap().unwrap();
        assert_eq!(by_pair.account_id, social);
    }

    #[tokio::test]
    async fn test_unknown_identity_resolves_to_none() {
        let db = Database::open(":memory:").await.unwrap();

        assert!(resolve_identity(&db, &IdentityClaim::Local { account_id: 999 })
            .await
            .unwrap()
            .is_none());

        let identity = IdentityClaim::Social {
            email: "ghost@x.com".to_string(),
            provider: Provider::Google,
        };
        assert!(resolve_identity(&db, &identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_provider_does_not_resolve() {
        let db = Database::open(":memory:").await.unwrap();
        db.accounts()
            .create_social("bob@x.com", Provider::Google, "bob")
            .await
            .unwrap();

        let identity = IdentityClaim::Social {
            email: "bob@x.com".to_string(),
            provider: Provider::Local,
        };
        assert!(resolve_identity(&db, &identity).await.unwrap().is_none());
    }
}
