#[cfg(test)]
mod storage_tests {
    use crate::{ListQuery, Storage, StorageError};
    use pipeline_core::{
        AccountRef, Access, OpportunityForm, Scope, SortBy, Stage, User,
    };
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let storage = Storage::new(&db_path).unwrap();
        (storage, temp_dir)
    }

    fn create_test_user(storage: &Storage, site_name: &str, username: &str) -> User {
        let site = storage.create_site(site_name).unwrap();
        storage.create_user(&site.id, username, username).unwrap()
    }

    fn test_form(name: &str) -> OpportunityForm {
        OpportunityForm { name: name.to_string(), ..OpportunityForm::default() }
    }

    fn default_query() -> ListQuery {
        ListQuery {
            page: 1,
            per_page: 20,
            sort: SortBy::Name,
            stages: None,
            query: None,
        }
    }

    fn seed_opportunities(storage: &Storage, scope: &Scope, count: usize) {
        for i in 0..count {
            storage
                .create_opportunity(
                    scope,
                    &test_form(&format!("Deal {i:02}")),
                    &AccountRef::New(format!("Account {i:02}")),
                )
                .unwrap();
        }
    }

    #[test]
    fn create_persists_opportunity_and_new_account_together() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();

        let opp = storage
            .create_opportunity(&scope, &test_form("Big deal"), &AccountRef::New("Globex".into()))
            .unwrap();

        let account = storage.get_account(&scope, &opp.account_id).unwrap();
        assert_eq!(account.name, "Globex");
        assert_eq!(opp.stage, Stage::Prospecting);
        assert_eq!(opp.access, Access::Public);

        let fetched = storage.get_opportunity(&scope, &opp.id).unwrap();
        assert_eq!(fetched.name, "Big deal");
        assert_eq!(fetched.account_id, account.id);
    }

    #[test]
    fn linking_missing_account_rolls_back_everything() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();

        let err = storage
            .create_opportunity(&scope, &test_form("Doomed"), &AccountRef::Existing("ghost".into()))
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { entity: "account", .. }));

        let page = storage.list_opportunities(&scope, &default_query()).unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn duplicate_account_name_is_reported() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();
        storage.create_account(&scope, "Globex").unwrap();

        let err = storage
            .create_opportunity(&scope, &test_form("Again"), &AccountRef::New("Globex".into()))
            .unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn records_are_invisible_across_sites() {
        let (storage, _temp_dir) = create_test_storage();
        let alice = create_test_user(&storage, "acme", "alice");
        let eve = create_test_user(&storage, "rival", "eve");

        let opp = storage
            .create_opportunity(
                &alice.scope(),
                &test_form("Secret"),
                &AccountRef::New("Globex".into()),
            )
            .unwrap();

        let err = storage.get_opportunity(&eve.scope(), &opp.id).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert_eq!(storage.list_opportunities(&eve.scope(), &default_query()).unwrap().total, 0);
    }

    #[test]
    fn private_records_hide_from_colleagues_and_shared_records_show() {
        let (storage, _temp_dir) = create_test_storage();
        let site = storage.create_site("acme").unwrap();
        let alice = storage.create_user(&site.id, "alice", "Alice").unwrap();
        let bob = storage.create_user(&site.id, "bob", "Bob").unwrap();

        let mut form = test_form("Private deal");
        form.access = Some(Access::Private);
        let private = storage
            .create_opportunity(&alice.scope(), &form, &AccountRef::New("Globex".into()))
            .unwrap();

        let mut form = test_form("Shared deal");
        form.access = Some(Access::Shared);
        form.shared_with = vec![bob.id.clone()];
        let shared = storage
            .create_opportunity(&alice.scope(), &form, &AccountRef::Existing(private.account_id.clone()))
            .unwrap();

        assert!(storage.get_opportunity(&bob.scope(), &private.id).is_err());
        assert!(storage.get_opportunity(&bob.scope(), &shared.id).is_ok());
        assert_eq!(storage.permitted_user_ids(&shared.id).unwrap(), vec![bob.id.clone()]);

        let page = storage.list_opportunities(&bob.scope(), &default_query()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, shared.id);
    }

    #[test]
    fn pagination_returns_the_tail_page() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();
        seed_opportunities(&storage, &scope, 12);

        let query = ListQuery { page: 3, per_page: 5, ..default_query() };
        let page = storage.list_opportunities(&scope, &query).unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "Deal 10");
        assert_eq!(page.items[1].name, "Deal 11");
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn listing_is_idempotent() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();
        seed_opportunities(&storage, &scope, 7);

        let query = ListQuery { per_page: 3, sort: SortBy::CreatedAt, ..default_query() };
        let first: Vec<String> = storage
            .list_opportunities(&scope, &query)
            .unwrap()
            .items
            .into_iter()
            .map(|o| o.id)
            .collect();
        let second: Vec<String> = storage
            .list_opportunities(&scope, &query)
            .unwrap()
            .items
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn stage_filter_restricts_results() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();

        for (i, stage) in [Stage::Prospecting, Stage::Negotiation, Stage::Won, Stage::Won]
            .into_iter()
            .enumerate()
        {
            let mut form = test_form(&format!("Deal {i}"));
            form.stage = Some(stage);
            storage
                .create_opportunity(&scope, &form, &AccountRef::New(format!("Acct {i}")))
                .unwrap();
        }

        let query = ListQuery {
            stages: Some(vec![Stage::Won, Stage::Negotiation]),
            ..default_query()
        };
        let page = storage.list_opportunities(&scope, &query).unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.iter().all(|o| matches!(o.stage, Stage::Won | Stage::Negotiation)));

        // Clearing the filter restores the full set.
        let page = storage.list_opportunities(&scope, &default_query()).unwrap();
        assert_eq!(page.total, 4);
    }

    #[test]
    fn search_matches_name_and_escapes_wildcards() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();
        storage
            .create_opportunity(&scope, &test_form("Acme renewal"), &AccountRef::New("A1".into()))
            .unwrap();
        storage
            .create_opportunity(&scope, &test_form("100% upsell"), &AccountRef::New("A2".into()))
            .unwrap();

        let query = ListQuery { query: Some("renewal".into()), ..default_query() };
        assert_eq!(storage.list_opportunities(&scope, &query).unwrap().total, 1);

        // A literal '%' must not act as a wildcard.
        let query = ListQuery { query: Some("0%".into()), ..default_query() };
        let page = storage.list_opportunities(&scope, &query).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "100% upsell");
    }

    #[test]
    fn stage_totals_are_consistent() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();

        for (i, stage) in [Stage::Prospecting, Stage::Prospecting, Stage::Won, Stage::Lost]
            .into_iter()
            .enumerate()
        {
            let mut form = test_form(&format!("Deal {i}"));
            form.stage = Some(stage);
            storage
                .create_opportunity(&scope, &form, &AccountRef::New(format!("Acct {i}")))
                .unwrap();
        }

        let totals = storage.stage_totals(&scope).unwrap();
        assert_eq!(totals.all, 4);
        assert_eq!(totals.stages[&Stage::Prospecting], 2);
        assert_eq!(totals.stages[&Stage::Won], 1);
        assert_eq!(totals.stages[&Stage::Analysis], 0);
        assert_eq!(totals.all, totals.named_sum() + totals.other);
    }

    #[test]
    fn update_syncs_account_and_permissions() {
        let (storage, _temp_dir) = create_test_storage();
        let site = storage.create_site("acme").unwrap();
        let alice = storage.create_user(&site.id, "alice", "Alice").unwrap();
        let bob = storage.create_user(&site.id, "bob", "Bob").unwrap();
        let scope = alice.scope();

        let opp = storage
            .create_opportunity(&scope, &test_form("Deal"), &AccountRef::New("Old Co".into()))
            .unwrap();

        let mut form = test_form("Deal renamed");
        form.stage = Some(Stage::Negotiation);
        form.access = Some(Access::Shared);
        form.shared_with = vec![bob.id.clone()];
        let updated = storage
            .update_opportunity(&scope, &opp.id, &form, &AccountRef::New("New Co".into()))
            .unwrap();

        assert_eq!(updated.name, "Deal renamed");
        assert_eq!(updated.stage, Stage::Negotiation);
        assert_ne!(updated.account_id, opp.account_id);
        assert_eq!(storage.permitted_user_ids(&opp.id).unwrap(), vec![bob.id]);

        // Flipping back to public drops the grants.
        let mut form = test_form("Deal renamed");
        form.access = Some(Access::Public);
        storage
            .update_opportunity(&scope, &opp.id, &form, &AccountRef::Existing(updated.account_id))
            .unwrap();
        assert!(storage.permitted_user_ids(&opp.id).unwrap().is_empty());
    }

    #[test]
    fn delete_returns_record_and_removes_it() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();
        let opp = storage
            .create_opportunity(&scope, &test_form("Goner"), &AccountRef::New("Acct".into()))
            .unwrap();

        let deleted = storage.delete_opportunity(&scope, &opp.id).unwrap();
        assert_eq!(deleted.name, "Goner");
        assert!(storage.get_opportunity(&scope, &opp.id).is_err());
        assert!(storage.delete_opportunity(&scope, &opp.id).is_err());
    }

    #[test]
    fn campaign_summary_reflects_current_rows() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");
        let scope = user.scope();
        let campaign = storage.create_campaign(&scope, "Spring push").unwrap();

        let mut form = test_form("Won deal");
        form.campaign_id = Some(campaign.id.clone());
        form.stage = Some(Stage::Won);
        form.amount = Some(500.0);
        form.discount = Some(100.0);
        storage
            .create_opportunity(&scope, &form, &AccountRef::New("Acct 1".into()))
            .unwrap();

        let mut form = test_form("Open deal");
        form.campaign_id = Some(campaign.id.clone());
        form.amount = Some(900.0);
        storage
            .create_opportunity(&scope, &form, &AccountRef::New("Acct 2".into()))
            .unwrap();

        let refreshed = storage.refresh_campaign_summary(&scope, &campaign.id).unwrap();
        assert_eq!(refreshed.opportunities_count, 2);
        assert!((refreshed.revenue - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn preferences_upsert_and_read_back() {
        let (storage, _temp_dir) = create_test_storage();
        let user = create_test_user(&storage, "acme", "alice");

        assert_eq!(storage.get_preference(&user.id, "opportunities_per_page").unwrap(), None);
        storage.set_preference(&user.id, "opportunities_per_page", "5").unwrap();
        storage.set_preference(&user.id, "opportunities_per_page", "10").unwrap();
        assert_eq!(
            storage.get_preference(&user.id, "opportunities_per_page").unwrap(),
            Some("10".to_string())
        );
    }

    #[test]
    fn site_users_except_excludes_self_and_other_sites() {
        let (storage, _temp_dir) = create_test_storage();
        let site = storage.create_site("acme").unwrap();
        let alice = storage.create_user(&site.id, "alice", "Alice").unwrap();
        let bob = storage.create_user(&site.id, "bob", "Bob").unwrap();
        create_test_user(&storage, "rival", "eve");

        let users = storage.site_users_except(&alice.scope()).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, bob.id);
    }
}
