mod quiz;

use std::sync::Arc;

use dotenv::dotenv;
use quiz::catalog::{Catalog, Character};
use quiz::{Phase, QuizSession};
use teloxide::{
    dispatching::dialogue::InMemStorage,
    prelude::*,
    types::{ChatId, InputFile, KeyboardButton, KeyboardMarkup},
};

type QuestDialogue = Dialogue<State, InMemStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveCharacterChoice,
    AnswerQuestion {
        session: QuizSession,
    },
    ShowCompletion {
        session: QuizSession,
    },
    CharacterUnavailable {
        session: QuizSession,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting the birthday quest bot...");

    let bot = Bot::from_env();

    let characters_dir =
        std::env::var("CHARACTERS_DIR").unwrap_or_else(|_| "characters_data".to_string());
    log::info!("Loading the character catalog from '{}'", characters_dir);
    let catalog =
        Arc::new(Catalog::load(&characters_dir).expect("Failed to load the character catalog"));
    log::info!(
        "Catalog loaded: {} characters, {} unlocked",
        catalog.characters().len(),
        catalog.unlocked().count()
    );

    let catalog_for_start = catalog.clone();
    let catalog_for_choice = catalog.clone();
    let catalog_for_completion = catalog.clone();
    let catalog_for_unavailable = catalog.clone();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, InMemStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(
                move |bot: Bot, dialogue: QuestDialogue, msg: Message| {
                    start(catalog_for_start.clone(), bot, dialogue, msg)
                },
            ))
            .branch(dptree::case![State::ReceiveCharacterChoice].endpoint(
                move |bot: Bot, dialogue: QuestDialogue, msg: Message| {
                    receive_character_choice(catalog_for_choice.clone(), bot, dialogue, msg)
                },
            ))
            .branch(dptree::case![State::AnswerQuestion { session }].endpoint(answer_question))
            .branch(dptree::case![State::ShowCompletion { session }].endpoint(
                move |bot: Bot, dialogue: QuestDialogue, session: QuizSession, msg: Message| {
                    show_completion(catalog_for_completion.clone(), bot, dialogue, session, msg)
                },
            ))
            .branch(dptree::case![State::CharacterUnavailable { session }].endpoint(
                move |bot: Bot, dialogue: QuestDialogue, session: QuizSession, msg: Message| {
                    character_unavailable(catalog_for_unavailable.clone(), bot, dialogue, session, msg)
                },
            )),
    )
    .dependencies(dptree::deps![InMemStorage::<State>::new()])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

const GREETING_TEXT: &str =
    "Привет! Это Квест Дня Рождения! Проверь, насколько хорошо ты знаешь дата-аналитиков и получи бонус!";
const CHOOSE_CHARACTER_TEXT: &str = "Выбери персонажа:";
const CHOOSE_FROM_KEYBOARD_TEXT: &str = "Пожалуйста, выбери один из вариантов на клавиатуре";
const BACK_TO_MAIN: &str = "Вернуться на главную";
const OPEN_BONUS: &str = "Я задонатил! Открыть бонус персонажа";

async fn start(
    catalog: Arc<Catalog>,
    bot: Bot,
    dialogue: QuestDialogue,
    msg: Message,
) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;
    bot.send_message(msg.chat.id, CHOOSE_CHARACTER_TEXT)
        .reply_markup(character_keyboard(&catalog))
        .await?;

    dialogue.update(State::ReceiveCharacterChoice).await?;
    Ok(())
}

async fn receive_character_choice(
    catalog: Arc<Catalog>,
    bot: Bot,
    dialogue: QuestDialogue,
    msg: Message,
) -> HandlerResult {
    // Locked characters never make it onto the keyboard, so an unknown name
    // here is just a mistyped message
    let character = match msg.text().and_then(|name| catalog.find_unlocked(name)) {
        Some(character) => character,
        None => {
            bot.send_message(msg.chat.id, CHOOSE_FROM_KEYBOARD_TEXT)
                .reply_markup(character_keyboard(&catalog))
                .await?;
            return Ok(());
        }
    };

    let mut session = QuizSession::new();
    session.select_character(character.clone());
    log::debug!("Character '{}' selected", character.name);

    // The quiz works fine without the picture, so a missing file is ignored
    let _ = bot
        .send_photo(msg.chat.id, InputFile::file(character.image.clone()))
        .await;
    bot.send_message(msg.chat.id, format!("Ты выбрал: {}", character.name))
        .await?;

    match session.phase() {
        Phase::NoQuestionsAvailable => {
            bot.send_message(
                msg.chat.id,
                "Персонаж ещё в разработке! Загляни позже — квиз будет готов!",
            )
            .reply_markup(KeyboardMarkup::new(vec![vec![KeyboardButton::new(
                BACK_TO_MAIN,
            )]]))
            .await?;
            dialogue
                .update(State::CharacterUnavailable { session })
                .await?;
        }
        _ => {
            send_current_question(&bot, msg.chat.id, &session).await?;
            dialogue.update(State::AnswerQuestion { session }).await?;
        }
    }
    Ok(())
}

async fn answer_question(
    bot: Bot,
    dialogue: QuestDialogue,
    mut session: QuizSession,
    msg: Message,
) -> HandlerResult {
    if !session.submit_answer(msg.text()) {
        if let Some(error) = session.take_error() {
            bot.send_message(msg.chat.id, error).await?;
        }
        send_current_question(&bot, msg.chat.id, &session).await?;
        dialogue.update(State::AnswerQuestion { session }).await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, "Правильно!").await?;

    match session.phase() {
        Phase::Completed => {
            let character = session.character().expect("a running quiz has a character");
            bot.send_message(
                msg.chat.id,
                completion_text(character, session.correct_count()),
            )
            .reply_markup(KeyboardMarkup::new(vec![
                vec![KeyboardButton::new(OPEN_BONUS)],
                vec![KeyboardButton::new(BACK_TO_MAIN)],
            ]))
            .await?;
            dialogue.update(State::ShowCompletion { session }).await?;
        }
        _ => {
            send_current_question(&bot, msg.chat.id, &session).await?;
            dialogue.update(State::AnswerQuestion { session }).await?;
        }
    }
    Ok(())
}

async fn show_completion(
    catalog: Arc<Catalog>,
    bot: Bot,
    dialogue: QuestDialogue,
    session: QuizSession,
    msg: Message,
) -> HandlerResult {
    match msg.text() {
        Some(OPEN_BONUS) => {
            match session.resolve_bonus() {
                Some(bonus) => {
                    bot.send_message(msg.chat.id, format!("{}\n\n{}", bonus.title, bonus.content))
                        .await?;
                    if let Some(image) = &bonus.image {
                        let _ = bot
                            .send_photo(msg.chat.id, InputFile::file(image.clone()))
                            .await;
                    }
                }
                None => {
                    bot.send_message(msg.chat.id, "У этого персонажа пока нет бонуса")
                        .await?;
                }
            }
            bot.send_message(msg.chat.id, "Спасибо за поддержку!")
                .reply_markup(KeyboardMarkup::new(vec![vec![KeyboardButton::new(
                    BACK_TO_MAIN,
                )]]))
                .await?;
            Ok(())
        }
        Some(BACK_TO_MAIN) => back_to_main(&catalog, bot, dialogue, msg).await,
        _ => {
            bot.send_message(msg.chat.id, CHOOSE_FROM_KEYBOARD_TEXT)
                .await?;
            Ok(())
        }
    }
}

async fn character_unavailable(
    catalog: Arc<Catalog>,
    bot: Bot,
    dialogue: QuestDialogue,
    session: QuizSession,
    msg: Message,
) -> HandlerResult {
    if let Some(character) = session.character() {
        log::debug!("Leaving not-yet-ready character '{}'", character.name);
    }
    back_to_main(&catalog, bot, dialogue, msg).await
}

// The "return to main" reset: the old session is dropped with the dialogue
// state, and choosing a character starts a fresh one
async fn back_to_main(
    catalog: &Catalog,
    bot: Bot,
    dialogue: QuestDialogue,
    msg: Message,
) -> HandlerResult {
    bot.send_message(msg.chat.id, CHOOSE_CHARACTER_TEXT)
        .reply_markup(character_keyboard(catalog))
        .await?;
    dialogue.update(State::ReceiveCharacterChoice).await?;
    Ok(())
}

fn character_keyboard(catalog: &Catalog) -> KeyboardMarkup {
    KeyboardMarkup::new(
        catalog
            .unlocked()
            .map(|character| vec![KeyboardButton::new(character.name.clone())])
            .collect::<Vec<_>>(),
    )
}

async fn send_current_question(bot: &Bot, chat_id: ChatId, session: &QuizSession) -> HandlerResult {
    let question = session
        .current_question()
        .expect("send_current_question called with no pending question");

    let keyboard = KeyboardMarkup::new(
        question
            .options
            .iter()
            .map(|option| vec![KeyboardButton::new(option.clone())])
            .collect::<Vec<_>>(),
    );
    bot.send_message(
        chat_id,
        format!("Вопрос {}: {}", session.stage() + 1, question.question),
    )
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

fn completion_text(character: &Character, correct: usize) -> String {
    let mut text = format!(
        "🎉 Квиз завершён! Ты ответил правильно на {} из {} вопросов.\n\nТы прошёл путь с персонажем: {}\n\nПоддержи подарок имениннику:",
        correct,
        character.questions.len(),
        character.name
    );
    for link in &character.donation_links {
        text.push_str(&format!("\n💸 {}: {}", link.name, link.url));
    }
    if let Some(phone) = &character.phone_donation {
        text.push_str(&format!(
            "\n📱 По номеру телефона (СБП, {}): {}",
            phone.banks.join(", "),
            phone.phone
        ));
    }
    text
}
